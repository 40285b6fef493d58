use crate::env::Environment;
use crate::style::{BLUE, GREEN, RESET};

/// Login name from the environment, falling back to "user".
fn user_name(env: &Environment) -> String {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .filter_map(|key| env.get_var(key))
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| "user".to_string())
}

fn host_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_string())
}

/// `user@host:cwd$ ` with the identity in green and the directory in blue.
pub(crate) fn render(env: &Environment) -> String {
    format!(
        "{GREEN}{}@{}{RESET}:{BLUE}{}{RESET}$ ",
        user_name(env),
        host_name(),
        env.current_dir.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[test]
    fn prompt_shows_user_and_directory() {
        let mut env = Environment {
            vars: HashMap::new(),
            current_dir: PathBuf::from("/srv/data"),
            should_exit: false,
        };
        env.set_var("USER", "alice");
        let prompt = render(&env);
        assert!(prompt.starts_with(&format!("{GREEN}alice@")), "{prompt}");
        assert!(prompt.ends_with(&format!(":{BLUE}/srv/data{RESET}$ ")), "{prompt}");
    }

    #[test]
    fn missing_user_falls_back() {
        let env = Environment {
            vars: HashMap::new(),
            current_dir: PathBuf::from("/"),
            should_exit: false,
        };
        assert_eq!(user_name(&env), "user");
    }
}
