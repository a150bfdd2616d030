use clap::ValueEnum;

/// Document format requested from `/_status`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Xml,
}

impl OutputFormat {
    pub fn as_param(self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Xml => "xml",
        }
    }
}
