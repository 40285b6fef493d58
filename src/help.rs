use crate::style::{CYAN, GREEN, RESET};
use std::fmt::Write as _;

pub struct CommandHelp {
    pub name: &'static str,
    pub summary: &'static str,
    pub usage: &'static str,
    pub options: &'static [(&'static str, &'static str)],
}

pub const COMMANDS: &[CommandHelp] = &[
    CommandHelp {
        name: "cd",
        summary: "Change the current directory",
        usage: "cd [path]",
        options: &[],
    },
    CommandHelp {
        name: "ls",
        summary: "List directory contents",
        usage: "ls [-l] [-a]",
        options: &[("-l", "Detailed listing"), ("-a", "Include hidden files")],
    },
    CommandHelp {
        name: "mkdir",
        summary: "Create a new directory",
        usage: "mkdir [directory]",
        options: &[],
    },
    CommandHelp {
        name: "rm",
        summary: "Remove files or directories",
        usage: "rm [options] [pattern]",
        options: &[
            ("-r", "Recursively remove directories"),
            ("-f", "Force removal without prompt"),
        ],
    },
    CommandHelp {
        name: "cp",
        summary: "Copy files or directories",
        usage: "cp [source] [destination]",
        options: &[],
    },
    CommandHelp {
        name: "mv",
        summary: "Move or rename files or directories",
        usage: "mv [source] [destination]",
        options: &[],
    },
    CommandHelp {
        name: "pwd",
        summary: "Print the current working directory",
        usage: "pwd",
        options: &[],
    },
    CommandHelp {
        name: "alias",
        summary: "Create or display aliases",
        usage: "alias [name='command']",
        options: &[],
    },
    CommandHelp {
        name: "unalias",
        summary: "Remove an alias",
        usage: "unalias [name]",
        options: &[],
    },
    CommandHelp {
        name: "export",
        summary: "Set an environment variable",
        usage: "export NAME=value",
        options: &[],
    },
    CommandHelp {
        name: "echo",
        summary: "Display a line of text",
        usage: "echo [arguments]",
        options: &[("-n", "Do not print the trailing newline")],
    },
    CommandHelp {
        name: "jobs",
        summary: "List background jobs",
        usage: "jobs",
        options: &[],
    },
    CommandHelp {
        name: "fg",
        summary: "Bring a background job to the foreground",
        usage: "fg [job_id]",
        options: &[],
    },
    CommandHelp {
        name: "source",
        summary: "Execute commands from a file",
        usage: "source [file]",
        options: &[],
    },
    CommandHelp {
        name: "help",
        summary: "Display help information",
        usage: "help [command]",
        options: &[],
    },
    CommandHelp {
        name: "exit",
        summary: "Exit the shell",
        usage: "exit",
        options: &[],
    },
];

pub fn lookup(name: &str) -> Option<&'static CommandHelp> {
    COMMANDS.iter().find(|c| c.name == name)
}

/// Overview of every built-in.
pub fn general() -> String {
    let mut text = format!("{GREEN}Available commands:{RESET}\n");
    for cmd in COMMANDS {
        let _ = writeln!(text, "  {CYAN}{:<24}{RESET}{}", cmd.usage, cmd.summary);
    }
    text.push_str("\nYou can also execute system commands, pipelines (a | b) and background jobs (cmd &).\n");
    text
}

/// Usage text for one command.
pub fn for_command(name: &str) -> String {
    let Some(cmd) = lookup(name) else {
        return format!("No help available for '{name}'.\n");
    };
    let mut text = format!("Usage: {}\n{}.\n", cmd.usage, cmd.summary);
    if !cmd.options.is_empty() {
        text.push_str("Options:\n");
        for (flag, desc) in cmd.options {
            let _ = writeln!(text, "  {flag:<4}{desc}");
        }
    }
    text
}
