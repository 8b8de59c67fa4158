//! Command-line options
//!
//! X-style single-dash flags: `-font <font>`, one flag per decoration color,
//! and `-version`. Values given here override the config file.

use crate::config::AppearanceConfig;

pub const USAGE: &str = "usage: labwm [options]\n    options are: -font <font>, \
                         -border|-text|-active|-inactive|-menu|-selected|-empty <color>";

/// What the command line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(Overrides),
    Version,
}

/// Unrecognised flag or a flag missing its value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageError(pub String);

/// Appearance values set on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub font: Option<String>,
    pub border: Option<String>,
    pub text: Option<String>,
    pub active: Option<String>,
    pub inactive: Option<String>,
    pub menu: Option<String>,
    pub selected: Option<String>,
    pub empty: Option<String>,
}

impl Overrides {
    pub fn apply(self, appearance: &mut AppearanceConfig) {
        let pairs = [
            (self.font, &mut appearance.font),
            (self.border, &mut appearance.border),
            (self.text, &mut appearance.text),
            (self.active, &mut appearance.active),
            (self.inactive, &mut appearance.inactive),
            (self.menu, &mut appearance.menu),
            (self.selected, &mut appearance.selected),
            (self.empty, &mut appearance.empty),
        ];
        for (value, field) in pairs {
            if let Some(value) = value {
                *field = value;
            }
        }
    }

    fn slot(&mut self, flag: &str) -> Option<&mut Option<String>> {
        Some(match flag {
            "-font" => &mut self.font,
            "-border" => &mut self.border,
            "-text" => &mut self.text,
            "-active" => &mut self.active,
            "-inactive" => &mut self.inactive,
            "-menu" => &mut self.menu,
            "-selected" => &mut self.selected,
            "-empty" => &mut self.empty,
            _ => return None,
        })
    }
}

/// Parse the arguments after the program name
pub fn parse<I>(args: I) -> Result<Command, UsageError>
where
    I: IntoIterator<Item = String>,
{
    let mut overrides = Overrides::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "-version" {
            return Ok(Command::Version);
        }
        let Some(slot) = overrides.slot(&arg) else {
            return Err(UsageError(arg));
        };
        match args.next() {
            Some(value) => *slot = Some(value),
            None => return Err(UsageError(arg)),
        }
    }
    Ok(Command::Run(overrides))
}
