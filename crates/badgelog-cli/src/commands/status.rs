//! Status command for summarizing the swipe store.

use std::io::Write;
use std::path::Path;

use anyhow::Result;

use badgelog_db::Database;

pub fn run<W: Write>(writer: &mut W, db: &Database, database_path: &Path) -> Result<()> {
    writeln!(writer, "Badge log status")?;
    writeln!(writer, "Database: {}", database_path.display())?;

    let total = db.swipe_count()?;
    if total == 0 {
        writeln!(writer, "No swipes recorded.")?;
        return Ok(());
    }

    writeln!(writer, "Swipes: {total}")?;
    writeln!(writer, "Categories:")?;
    for summary in db.category_summaries()? {
        let label = summary.category.as_deref().unwrap_or("(uncategorized)");
        writeln!(
            writer,
            "- {label}: {} (last {})",
            summary.rows, summary.last_swipe_at
        )?;
    }

    let directory = db.subject_count()?;
    writeln!(writer, "Subject directory entries: {directory}")?;

    Ok(())
}
