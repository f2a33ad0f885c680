use indicatif::{ProgressBar, ProgressStyle};

/// Output context handed to every step of a run.
///
/// `status` lines are always printed, `detail` lines only when verbose output was
/// requested at construction. Diagnostics for developers go through `log` instead.
#[derive(Clone, Copy, Debug, Default)]
pub struct Reporter {
    verbose: bool,
}

impl Reporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn status(&self, message: impl AsRef<str>) {
        println!("{}", message.as_ref());
    }

    pub fn detail(&self, message: impl AsRef<str>) {
        if self.verbose {
            println!("  {}", message.as_ref());
        }
    }

    /// Byte progress bar for a download; indicatif hides it when stderr is not a terminal.
    pub fn download_bar(&self) -> ProgressBar {
        let style = ProgressStyle::with_template(
            "{bar:40.cyan/blue} {bytes}/{total_bytes} {msg} {bytes_per_sec}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        ProgressBar::new(0).with_style(style)
    }

    pub fn problem(&self, message: impl AsRef<str>) {
        eprintln!("{}", message.as_ref());
    }
}
