use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use std::path::MAIN_SEPARATOR;

/// Where answers come from. The terminal in the binary, a script in tests.
pub trait Prompter {
    ///Free-text answer; empty input accepts `default`
    fn input(&mut self, prompt: &str, default: &str) -> color_eyre::Result<String>;

    fn confirm(&mut self, prompt: &str, default: bool) -> color_eyre::Result<bool>;
}

///The answer a raw line of input stands for
pub fn choose(answer: &str, default: &str) -> String {
    let answer = answer.trim();
    if answer.is_empty() {
        default.to_owned()
    } else {
        answer.to_owned()
    }
}

///Final segment of `path`, or all of it when there is no separator
pub fn default_upload_name(path: &str) -> String {
    path.rsplit(['/', MAIN_SEPARATOR])
        .next()
        .unwrap_or(path)
        .to_owned()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    Upload { name: String },
    Abort,
}

/// Runs the confirmation dialogue for `path`.
///
/// Declining the first question aborts. After that the user is asked for a name
/// until they accept one, so the dialogue never ends in [`Plan::Abort`] past that point.
pub fn plan_upload(prompter: &mut impl Prompter, path: &str) -> color_eyre::Result<Plan> {
    if !prompter.confirm(&format!("Upload `{path}` to Google Drive?"), true)? {
        return Ok(Plan::Abort);
    }

    let mut name = default_upload_name(path);
    loop {
        name = prompter.input("Upload name", &name)?;
        if name.is_empty() {
            warn!("Upload name cannot be empty");
            continue;
        }

        if prompter.confirm(&format!("File will be uploaded as `{name}`. Okay?"), true)? {
            return Ok(Plan::Upload { name });
        }
    }
}

pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Prompter for TerminalPrompter {
    fn input(&mut self, prompt: &str, default: &str) -> color_eyre::Result<String> {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true);
        if !default.is_empty() {
            input = input.default(default.to_owned());
        }

        let answer = input.interact_text()?;
        Ok(choose(&answer, default))
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> color_eyre::Result<bool> {
        Ok(Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()?)
    }
}
