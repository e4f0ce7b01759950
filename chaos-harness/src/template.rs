//! Test command templates.
//!
//! Arguments may reference `{PATH}`, `{HOST}` and `{PORT}`; `{{` and `}}`
//! produce literal braces.

use crate::error::{HarnessError, Result};

/// Values substituted into test command arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateContext {
    path: String,
    host: String,
    port: u16,
}

impl TemplateContext {
    /// Context for a harness at `path` whose seed listens on `host:port`.
    pub fn new(path: String, host: String, port: u16) -> Self {
        Self { path, host, port }
    }

    fn lookup(&self, key: &str) -> Option<String> {
        match key {
            "PATH" => Some(self.path.clone()),
            "HOST" => Some(self.host.clone()),
            "PORT" => Some(self.port.to_string()),
            _ => None,
        }
    }

    /// Render one argument.
    pub fn render(&self, arg: &str) -> Result<String> {
        let mut out = String::with_capacity(arg.len());
        let mut chars = arg.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '{' => {
                    let mut key = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(k) => key.push(k),
                            None => {
                                return Err(HarnessError::Template(format!(
                                    "unclosed '{{' in {:?}",
                                    arg
                                )))
                            }
                        }
                    }
                    let value = self.lookup(&key).ok_or_else(|| {
                        HarnessError::Template(format!("unknown key {{{}}} in {:?}", key, arg))
                    })?;
                    out.push_str(&value);
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '}' => {
                    return Err(HarnessError::Template(format!(
                        "single '}}' in {:?}",
                        arg
                    )))
                }
                c => out.push(c),
            }
        }

        Ok(out)
    }

    /// Render every argument of a command.
    pub fn render_all(&self, args: &[String]) -> Result<Vec<String>> {
        args.iter().map(|a| self.render(a)).collect()
    }
}
