//! 终端状态输出
//!
//! 所有类别语义相同，只在呈现方式（颜色）上有区别。静默模式下不输出任何内容，
//! 也不改变光标状态。

use console::{style, Term};
use scopeguard::ScopeGuard;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 消息类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    /// 警告或错误
    Warning,
    Added,
    Removed,
    Success,
}

/// 输出端
pub trait ReportSink: Send + Sync {
    /// `replace` 为 true 时覆盖上一行进度，否则追加新行
    fn write(&self, kind: MessageKind, text: &str, replace: bool);

    fn set_cursor_visible(&self, visible: bool);
}

/// 标准输出终端
pub struct TerminalSink {
    term: Term,
    progress_open: AtomicBool,
}

impl TerminalSink {
    pub fn stdout() -> Self {
        Self {
            term: Term::stdout(),
            progress_open: AtomicBool::new(false),
        }
    }

    fn styled(kind: MessageKind, text: &str) -> String {
        match kind {
            MessageKind::Info => style(text).cyan().to_string(),
            MessageKind::Warning => style(text).red().to_string(),
            MessageKind::Added => style(text).green().to_string(),
            MessageKind::Removed => style(text).yellow().to_string(),
            MessageKind::Success => style(text).green().bold().to_string(),
        }
    }
}

impl ReportSink for TerminalSink {
    fn write(&self, kind: MessageKind, text: &str, replace: bool) {
        let line = Self::styled(kind, text);
        if replace {
            // 非终端输出时不显示进度行
            if !self.term.is_term() {
                return;
            }
            let _ = self.term.clear_line();
            let _ = self.term.write_str(&line);
            self.progress_open.store(true, Ordering::Relaxed);
        } else {
            if self.progress_open.swap(false, Ordering::Relaxed) {
                let _ = self.term.clear_line();
            }
            let _ = self.term.write_line(&line);
        }
    }

    fn set_cursor_visible(&self, visible: bool) {
        if !self.term.is_term() {
            return;
        }
        let _ = if visible {
            self.term.show_cursor()
        } else {
            self.term.hide_cursor()
        };
    }
}

/// 光标隐藏期间持有的守卫，释放时恢复光标
pub type CursorGuard<'a> = ScopeGuard<&'a Reporter, fn(&Reporter)>;

#[derive(Clone)]
pub struct Reporter {
    silent: bool,
    sink: Arc<dyn ReportSink>,
}

impl Reporter {
    pub fn new(silent: bool) -> Self {
        Self::with_sink(silent, Arc::new(TerminalSink::stdout()))
    }

    pub fn with_sink(silent: bool, sink: Arc<dyn ReportSink>) -> Self {
        Self { silent, sink }
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    /// 追加一行状态
    pub fn emit(&self, message: impl AsRef<str>, kind: MessageKind) {
        if !self.silent {
            self.sink.write(kind, message.as_ref(), false);
        }
    }

    /// 覆盖当前进度行
    pub fn progress(&self, message: impl AsRef<str>, kind: MessageKind) {
        if !self.silent {
            self.sink.write(kind, message.as_ref(), true);
        }
    }

    /// 隐藏光标，守卫离开作用域时（无论成功还是失败）恢复
    pub fn hide_cursor(&self) -> CursorGuard<'_> {
        if !self.silent {
            self.sink.set_cursor_visible(false);
        }
        scopeguard::guard(self, Self::restore_cursor as fn(&Reporter))
    }

    fn restore_cursor(&self) {
        if !self.silent {
            self.sink.set_cursor_visible(true);
        }
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("silent", &self.silent)
            .finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{recording, Event};
    use super::*;

    #[test]
    fn silent_reporter_emits_nothing() {
        let (reporter, sink) = recording(true);

        {
            let _cursor = reporter.hide_cursor();
            reporter.emit("hello", MessageKind::Info);
            reporter.progress("50%", MessageKind::Info);
        }

        assert!(sink.events().is_empty());
    }

    #[test]
    fn status_and_progress_lines_are_distinguished() {
        let (reporter, sink) = recording(false);

        reporter.emit("- data/a.txt", MessageKind::Removed);
        reporter.progress("data/a.txt 50%", MessageKind::Info);
        reporter.emit("+ data/a.txt", MessageKind::Added);

        assert_eq!(
            sink.events(),
            vec![
                Event::Line(MessageKind::Removed, "- data/a.txt".to_string()),
                Event::Progress(MessageKind::Info, "data/a.txt 50%".to_string()),
                Event::Line(MessageKind::Added, "+ data/a.txt".to_string()),
            ]
        );
    }

    #[test]
    fn cursor_is_restored_when_guard_drops() {
        let (reporter, sink) = recording(false);

        {
            let _cursor = reporter.hide_cursor();
            reporter.emit("working", MessageKind::Info);
        }

        assert_eq!(
            sink.events(),
            vec![
                Event::Cursor(false),
                Event::Line(MessageKind::Info, "working".to_string()),
                Event::Cursor(true),
            ]
        );
    }

    #[test]
    fn cursor_is_restored_on_early_return() {
        fn run(reporter: &Reporter, fail: bool) -> Result<(), &'static str> {
            let _cursor = reporter.hide_cursor();
            if fail {
                return Err("boom");
            }
            reporter.emit("done", MessageKind::Success);
            Ok(())
        }

        let (reporter, sink) = recording(false);
        assert!(run(&reporter, true).is_err());

        assert_eq!(sink.events(), vec![Event::Cursor(false), Event::Cursor(true)]);
    }
}
