use crossterm::style::Stylize;

/// Where user-facing progress and results are written.
pub trait OutputSink {
    fn info(&mut self, text: &str);
    fn warn(&mut self, text: &str);
    fn success(&mut self, text: &str);
    fn commit_message(&mut self, message: &str);
}

/// Styled stdout/stderr output for a terminal.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl OutputSink for ConsoleSink {
    fn info(&mut self, text: &str) {
        println!("{}", text.blue());
    }

    fn warn(&mut self, text: &str) {
        eprintln!("{} {}", "warning:".yellow().bold(), text.yellow());
    }

    fn success(&mut self, text: &str) {
        println!("{}", text.green());
    }

    fn commit_message(&mut self, message: &str) {
        println!();
        println!("{}", "Generated Commit Message".bold().blue());
        println!();
        for line in message.lines() {
            println!("  {}", line);
        }
        println!();
        println!("{}", "You can commit using:".blue());
        println!("git commit -m \"{}\"", message.replace('"', "\\\""));
        println!();
    }
}
