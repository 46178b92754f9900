//! Console rendering of supervisor notices.

use orca_supervisor::{Notice, NoticeLevel, Notifier};

use tracing::debug;

/// Prints notices on the terminal, the CLI stand-in for editor toasts.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub(crate) fn render(notice: &Notice) -> String {
        match notice.level {
            NoticeLevel::Info => notice.message.clone(),
            NoticeLevel::Warning => format!("warning: {}", notice.message),
            NoticeLevel::Error => format!("error: {}", notice.message),
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        debug!(target: "orca::notice", "{notice}");

        let line = Self::render(&notice);
        match notice.level {
            NoticeLevel::Info => println!("{line}"),
            NoticeLevel::Warning | NoticeLevel::Error => eprintln!("{line}"),
        }
    }
}
