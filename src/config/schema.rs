use crate::formatter::ExternalFormatter;
use crate::reformat::Mode;
use crate::region::RegionRule;
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Extensions handled by `clang-format` out of the box.
pub const C_EXTENSIONS: &[&str] = &[".c", ".cc", ".cpp", ".cxx", ".h", ".hpp"];
/// Extensions handled by `goimports` out of the box.
pub const GO_EXTENSIONS: &[&str] = &[".go"];

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ReformatConfig {
    #[serde(default)]
    pub mode: SyncMode,
    #[serde(default)]
    pub region: RegionRule,
    #[serde(default = "default_true")]
    pub builtin_formatters: bool,
    #[serde(default)]
    pub formatters: Vec<FormatterSpec>,
}

fn default_true() -> bool {
    true
}

impl Default for ReformatConfig {
    fn default() -> Self {
        Self {
            mode: SyncMode::default(),
            region: RegionRule::default(),
            builtin_formatters: true,
            formatters: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// Diff the whole document against the formatter output.
    #[default]
    WholeFile,
    /// Only resynchronise the leading region.
    TopRegion,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FormatterSpec {
    #[serde(default)]
    pub name: Option<String>,
    /// Filename suffixes this formatter applies to, e.g. `.go`
    pub extensions: Vec<String>,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl FormatterSpec {
    pub fn new(command: impl Into<String>, extensions: &[&str]) -> Self {
        Self {
            name: None,
            extensions: extensions.iter().map(|ext| ext.to_string()).collect(),
            command: command.into(),
            args: Vec::new(),
        }
    }

    pub fn matches(&self, path: &Path) -> bool {
        let name = path.to_string_lossy();
        self.extensions
            .iter()
            .any(|ext| !ext.is_empty() && name.ends_with(ext.as_str()))
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.command)
    }

    pub fn to_formatter(&self) -> ExternalFormatter {
        ExternalFormatter::new(&self.command).with_args(self.args.iter().cloned())
    }
}

/// Formatters used when the configuration does not opt out of them.
pub fn builtin_formatters() -> Vec<FormatterSpec> {
    vec![
        FormatterSpec::new("clang-format", C_EXTENSIONS),
        FormatterSpec::new("goimports", GO_EXTENSIONS),
    ]
}

impl ReformatConfig {
    pub fn mode(&self) -> Mode {
        match self.mode {
            SyncMode::WholeFile => Mode::WholeFile,
            SyncMode::TopRegion => Mode::TopRegion(self.region.clone()),
        }
    }

    /// Put `spec` ahead of every configured formatter.
    pub fn prepend_formatter(&mut self, spec: FormatterSpec) {
        self.formatters.insert(0, spec);
    }

    /// First formatter whose extensions match `path`. User formatters are
    /// consulted in order before the built-ins.
    pub fn formatter_for(&self, path: &Path) -> Option<FormatterSpec> {
        if let Some(spec) = self.formatters.iter().find(|spec| spec.matches(path)) {
            return Some(spec.clone());
        }
        if !self.builtin_formatters {
            return None;
        }
        builtin_formatters()
            .into_iter()
            .find(|spec| spec.matches(path))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        for (idx, spec) in self.formatters.iter().enumerate() {
            let formatter = spec
                .name
                .clone()
                .unwrap_or_else(|| format!("#{}", idx + 1));

            if spec.command.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    formatter: Some(formatter.clone()),
                    field: "command",
                });
            }
            if spec.extensions.is_empty() {
                issues.push(ValidationIssue::MissingField {
                    formatter: Some(formatter.clone()),
                    field: "extensions",
                });
            }
            if spec.extensions.iter().any(|ext| ext.trim().is_empty()) {
                issues.push(ValidationIssue::Invalid {
                    formatter: Some(formatter),
                    message: "extensions must not contain empty entries".to_string(),
                });
            }
        }

        if let RegionRule::Sentinel { prefix } = &self.region {
            if prefix.is_empty() {
                issues.push(ValidationIssue::MissingField {
                    formatter: None,
                    field: "region.prefix",
                });
            }
        }

        if self.formatters.is_empty() && !self.builtin_formatters {
            issues.push(ValidationIssue::NoFormatters);
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    NoFormatters,
    MissingField {
        formatter: Option<String>,
        field: &'static str,
    },
    Invalid {
        formatter: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::NoFormatters => {
                write!(f, "no formatters configured and built-ins disabled")
            }
            ValidationIssue::MissingField { formatter, field } => match formatter {
                Some(name) => write!(f, "formatter '{name}' missing required field '{field}'"),
                None => write!(f, "missing required field '{field}'"),
            },
            ValidationIssue::Invalid { formatter, message } => match formatter {
                Some(name) => write!(f, "formatter '{name}' is invalid: {message}"),
                None => write!(f, "invalid configuration: {message}"),
            },
        }
    }
}
