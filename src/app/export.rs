use crate::adapters::BoardRepository;
use crate::app::leaderboard;
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

/// Bundles the public face of the board (standings, level board, raw state)
/// into one archive for publishing elsewhere.
pub struct Exporter<S, D> {
    repo: BoardRepository<S>,
    dest: D,
}

impl<S: Storage, D: Storage> Exporter<S, D> {
    pub fn new(repo: BoardRepository<S>, dest: D) -> Self {
        Self { repo, dest }
    }

    /// Write the archive under `filename` in the destination storage and
    /// return the name. `include_state` adds the raw board JSON for backup
    /// purposes.
    pub async fn export_archive(&self, filename: &str, include_state: bool) -> Result<String> {
        let state = self.repo.load().await?;

        let standings = leaderboard::user_standings(&state);
        let standings_csv = leaderboard::standings_csv(&standings)?;
        let entries = leaderboard::level_board(&state);
        let levels_csv = leaderboard::level_board_csv(&entries)?;

        tracing::debug!(
            standings = standings.len(),
            levels = entries.len(),
            include_state,
            "building export archive"
        );

        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

            zip.start_file::<_, ()>("standings.csv", FileOptions::default())?;
            zip.write_all(standings_csv.as_bytes())?;

            zip.start_file::<_, ()>("levels.csv", FileOptions::default())?;
            zip.write_all(levels_csv.as_bytes())?;

            if include_state {
                zip.start_file::<_, ()>("board.json", FileOptions::default())?;
                let json = serde_json::to_string_pretty(&state)?;
                zip.write_all(json.as_bytes())?;
            }

            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        self.dest.write_file(filename, &zip_data).await?;
        tracing::info!(filename, bytes = zip_data.len(), "export written");
        Ok(filename.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStorage;
    use crate::domain::model::BoardState;

    async fn exporter() -> (Exporter<MemoryStorage, MemoryStorage>, MemoryStorage) {
        let repo = BoardRepository::new(MemoryStorage::new(), "board.json");
        repo.save(&BoardState::default()).await.unwrap();
        let dest = MemoryStorage::new();
        (Exporter::new(repo, dest.clone()), dest)
    }

    #[tokio::test]
    async fn archive_contains_both_csv_files() {
        let (exporter, dest) = exporter().await;
        exporter.export_archive("export.zip", false).await.unwrap();

        let data = dest.read_file("export.zip").await.unwrap();
        let cursor = std::io::Cursor::new(data);
        let mut archive = zip::ZipArchive::new(cursor).unwrap();

        assert_eq!(archive.len(), 2);
        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["levels.csv", "standings.csv"]);
    }

    #[tokio::test]
    async fn archive_includes_state_when_asked() {
        let (exporter, dest) = exporter().await;
        exporter.export_archive("export.zip", true).await.unwrap();

        let data = dest.read_file("export.zip").await.unwrap();
        let cursor = std::io::Cursor::new(data);
        let mut archive = zip::ZipArchive::new(cursor).unwrap();

        assert_eq!(archive.len(), 3);
        assert!(archive.by_name("board.json").is_ok());
    }
}
