use crate::conversion::OutputFormat;
use crate::i18n::{self, Localizer};
use crate::prefs::Preferences;
use anyhow::Result;

pub mod args;
pub mod convert;

pub use args::{Cli, CliCommand, ConvertCliArgs, PrefsCliArgs, Toggle};
pub use convert::handle_convert_command;

pub fn handle_prefs_command(args: PrefsCliArgs) -> Result<()> {
    let mut prefs = Preferences::load()?;

    if let Some(dark) = args.dark {
        prefs.set_dark_mode(dark == Toggle::On)?;
    }
    if let Some(locale) = args.locale.as_deref() {
        prefs.set_locale(locale)?;
    }

    let locale = prefs.locale().unwrap_or(i18n::DEFAULT_LOCALE);
    println!("Theme:  {}", if prefs.dark_mode() { "dark" } else { "light" });
    println!("Locale: {}", locale);
    println!("Title:  {}", Localizer::default().lookup("title", locale));
    Ok(())
}

pub fn handle_formats_command() {
    for format in OutputFormat::ALL {
        let note = if format.is_native() {
            "recorded directly"
        } else {
            "converted with ffmpeg"
        };
        println!(
            "{:<5} {:<11} .{:<5} {}",
            format.to_string(),
            format.mime_type(),
            format.extension(),
            note
        );
    }
}
