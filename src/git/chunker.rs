use crate::git::{Chunk, ChunkKind};

/// Groups diff lines into chunks
///
/// Consecutive lines with the same origin are merged into one chunk. Hunks are
/// separated by unchanged text that the diff does not show, so a hunk boundary
/// always starts a new chunk.
#[derive(Debug, Default)]
pub struct ChunkBuilder {
    chunks: Vec<Chunk>,
    open: bool,
}

impl ChunkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new hunk
    pub fn begin_hunk(&mut self) {
        self.open = false;
    }

    /// Add one diff line given its libgit2 origin character
    ///
    /// End-of-file markers (`=`, `>`, `<`) and header origins are ignored.
    pub fn push_line(&mut self, origin: char, content: &str) {
        let kind = match origin {
            '+' => ChunkKind::Added,
            '-' => ChunkKind::Removed,
            ' ' => ChunkKind::Unchanged,
            _ => return,
        };
        self.push(kind, content);
    }

    fn push(&mut self, kind: ChunkKind, content: &str) {
        if self.open
            && let Some(last) = self.chunks.last_mut()
            && last.kind == kind
        {
            last.content.push_str(content);
            return;
        }
        self.chunks.push(Chunk::new(kind, content));
        self.open = true;
    }

    pub fn finish(self) -> Vec<Chunk> {
        self.chunks
    }
}
