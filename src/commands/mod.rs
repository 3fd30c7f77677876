mod config_cmd;
mod menu;
mod restaurant;

pub use config_cmd::ConfigCommand;
pub use menu::MenuCommand;
pub use restaurant::RestaurantCommand;

use clap::ValueEnum;
use std::io::{self, Write};

use cloudmenu::controller::{ListEntity, ListError, ListEvent, Operation};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Finds a list entry by exact id, falling back to a case-insensitive name match.
pub(crate) fn find_entry<'a, T: ListEntity>(
    entries: &'a [T],
    identifier: &str,
) -> Result<&'a T, String> {
    if let Some(entry) = entries.iter().find(|e| e.id().as_str() == identifier) {
        return Ok(entry);
    }

    let mut matches = entries
        .iter()
        .filter(|e| e.name().eq_ignore_ascii_case(identifier));
    match (matches.next(), matches.next()) {
        (Some(entry), None) => Ok(entry),
        (Some(_), Some(_)) => Err(format!(
            "More than one entry is named '{}'; use its id instead",
            identifier
        )),
        (None, _) => Err(format!("Not found: {}", identifier)),
    }
}

/// Asks on stdout for a y/N answer.
pub(crate) fn confirm(question: &str) -> io::Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// First remote delete failure among the events received so far.
pub(crate) fn delete_failure<T: Clone>(
    events: &mut tokio::sync::broadcast::Receiver<ListEvent<T>>,
) -> Option<ListError> {
    while let Ok(event) = events.try_recv() {
        if let ListEvent::OperationFailed {
            operation: Operation::Delete,
            error,
        } = event
        {
            return Some(error);
        }
    }
    None
}

/// Shortens `name` to `width` characters for table output.
pub(crate) fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() > width {
        let kept: String = name.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        name.to_string()
    }
}
