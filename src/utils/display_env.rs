use crate::config::DisplayConfig;
use std::collections::HashMap;
use tracing::debug;

/// Переменные окружения X-сессии для внешних утилит и дочерних процессов.
///
/// Супервизор запускается от root (часто из systemd без графической сессии),
/// поэтому DISPLAY и XAUTHORITY подставляются явно в каждую команду.
#[derive(Debug, Clone, Default)]
pub struct DisplayEnv {
    vars: HashMap<String, String>,
}

impl DisplayEnv {
    pub fn from_config(display: &DisplayConfig) -> Self {
        let mut vars = HashMap::new();
        vars.insert("DISPLAY".to_string(), display.display.clone());

        if let Some(xauthority) = &display.xauthority {
            vars.insert("XAUTHORITY".to_string(), xauthority.clone());
        } else if let Ok(xauthority) = std::env::var("XAUTHORITY") {
            debug!("XAUTHORITY берём из окружения: {}", xauthority);
            vars.insert("XAUTHORITY".to_string(), xauthority);
        }

        Self { vars }
    }

    pub fn apply(&self, cmd: &mut tokio::process::Command) {
        for (key, value) in &self.vars {
            cmd.env(key, value);
        }
    }

    /// Создать команду с уже подставленными переменными дисплея
    pub fn command(&self, program: &str, args: &[&str]) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args);
        self.apply(&mut cmd);
        cmd
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}
