use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;
use url::{form_urlencoded, Url};

use crate::clock::Clock;
use crate::error::{PuzzleError, PuzzleResult};
use crate::grid::{grid_for_image, GridSpec};
use crate::image::ImageRef;
use crate::leaderboard::{display_player_name, LeaderboardStore};
use crate::store::{
    read_json, read_json_list, write_json, KeyValueStore, LAST_PLAYER_NAME_KEY,
    LAST_PUZZLE_ID_KEY, PUZZLES_KEY,
};

pub const PUZZLE_ID_LEN: usize = 10;
pub const SHARE_TOKEN_LEN: usize = 16;
pub const ID_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
pub const DEFAULT_PUZZLE_NAME: &str = "Untitled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    Link,
}

impl Visibility {
    pub fn tag(&self) -> &'static str {
        match self {
            Visibility::Public => "Public",
            Visibility::Private => "Private",
            Visibility::Link => "Link-only",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::Link => "link",
        };
        f.write_str(value)
    }
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            "link" | "link-only" => Ok(Visibility::Link),
            other => Err(format!("unknown visibility '{other}'")),
        }
    }
}

/// Encoded image as persisted alongside its record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredImage {
    pub image_ref: ImageRef,
    pub mime: String,
    /// Base64 of the encoded file bytes.
    pub data: String,
}

impl StoredImage {
    pub fn from_bytes(image_ref: ImageRef, mime: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            image_ref,
            mime: mime.into(),
            data: STANDARD.encode(bytes),
        }
    }

    pub fn bytes(&self) -> PuzzleResult<Vec<u8>> {
        STANDARD
            .decode(self.data.as_bytes())
            .map_err(|err| PuzzleError::ImageUnavailable(err.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuzzleRecord {
    pub id: String,
    pub name: String,
    pub visibility: Visibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub piece_count: u32,
    pub grid: GridSpec,
    pub image: StoredImage,
    pub created_at: u64,
}

impl PuzzleRecord {
    /// Whether a visitor holding `token` may play this puzzle.
    pub fn allows(&self, token: Option<&str>) -> bool {
        match self.visibility {
            Visibility::Link => match (self.token.as_deref(), token) {
                (Some(expected), Some(given)) => expected == given,
                _ => false,
            },
            Visibility::Public | Visibility::Private => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewPuzzle {
    pub name: String,
    pub visibility: Visibility,
    pub piece_count: u32,
    pub image: StoredImage,
}

pub fn random_id<R: Rng>(rng: &mut R, len: usize) -> String {
    let alphabet = ID_ALPHABET.as_bytes();
    let mut id = String::with_capacity(len);
    for _ in 0..len {
        let idx = rng.random_range(0..alphabet.len());
        id.push(alphabet[idx] as char);
    }
    id
}

pub struct PuzzleLibrary<'a, S: KeyValueStore + ?Sized> {
    store: &'a mut S,
    clock: &'a dyn Clock,
}

impl<'a, S: KeyValueStore + ?Sized> PuzzleLibrary<'a, S> {
    pub fn new(store: &'a mut S, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// Stored puzzles, newest first.
    pub fn list(&self) -> PuzzleResult<Vec<PuzzleRecord>> {
        read_json_list(&*self.store, PUZZLES_KEY)
    }

    fn save_all(&mut self, records: &[PuzzleRecord]) -> PuzzleResult<()> {
        write_json(&mut *self.store, PUZZLES_KEY, &records)
    }

    pub fn find(&self, id: &str) -> PuzzleResult<Option<PuzzleRecord>> {
        Ok(self.list()?.into_iter().find(|record| record.id == id))
    }

    pub fn get(&self, id: &str) -> PuzzleResult<PuzzleRecord> {
        self.find(id)?
            .ok_or_else(|| PuzzleError::MissingPuzzleRecord(id.to_string()))
    }

    pub fn create<R: Rng>(
        &mut self,
        new: NewPuzzle,
        rng: &mut R,
    ) -> PuzzleResult<PuzzleRecord> {
        let image_ref = &new.image.image_ref;
        let grid = grid_for_image(new.piece_count, image_ref.width, image_ref.height)?;
        let name = new.name.trim();
        let token = match new.visibility {
            Visibility::Link => Some(random_id(rng, SHARE_TOKEN_LEN)),
            Visibility::Public | Visibility::Private => None,
        };
        let record = PuzzleRecord {
            id: random_id(rng, PUZZLE_ID_LEN),
            name: if name.is_empty() {
                DEFAULT_PUZZLE_NAME.to_string()
            } else {
                name.to_string()
            },
            visibility: new.visibility,
            token,
            piece_count: new.piece_count,
            grid,
            image: new.image,
            created_at: self.clock.now_ms(),
        };
        let mut records = self.list()?;
        records.retain(|existing| existing.id != record.id);
        records.insert(0, record.clone());
        self.save_all(&records)?;
        self.set_last_puzzle_id(&record.id)?;
        info!(
            id = %record.id,
            name = %record.name,
            pieces = record.piece_count,
            cols = grid.cols,
            rows = grid.rows,
            "puzzle created"
        );
        Ok(record)
    }

    /// Removes the record and its leaderboard. Returns whether it existed.
    pub fn delete(&mut self, id: &str) -> PuzzleResult<bool> {
        let mut records = self.list()?;
        let before = records.len();
        records.retain(|record| record.id != id);
        if records.len() == before {
            return Ok(false);
        }
        self.save_all(&records)?;
        LeaderboardStore::new(&mut *self.store, self.clock).clear(id)?;
        if self.last_puzzle_id()?.as_deref() == Some(id) {
            self.store.remove(LAST_PUZZLE_ID_KEY)?;
        }
        info!(id, "puzzle deleted");
        Ok(true)
    }

    /// Resolves a play request. Link-only puzzles need their exact token.
    pub fn open(&mut self, id: &str, token: Option<&str>) -> PuzzleResult<PuzzleRecord> {
        let record = self.get(id)?;
        if !record.allows(token) {
            return Err(PuzzleError::UnauthorizedLinkAccess(id.to_string()));
        }
        self.set_last_puzzle_id(id)?;
        Ok(record)
    }

    pub fn last_puzzle_id(&self) -> PuzzleResult<Option<String>> {
        read_json(&*self.store, LAST_PUZZLE_ID_KEY)
    }

    fn set_last_puzzle_id(&mut self, id: &str) -> PuzzleResult<()> {
        write_json(&mut *self.store, LAST_PUZZLE_ID_KEY, &id)
    }

    /// The last opened puzzle, if it is still stored.
    pub fn last_opened(&self) -> PuzzleResult<Option<PuzzleRecord>> {
        match self.last_puzzle_id()? {
            Some(id) => self.find(&id),
            None => Ok(None),
        }
    }

    pub fn last_player_name(&self) -> PuzzleResult<Option<String>> {
        read_json(&*self.store, LAST_PLAYER_NAME_KEY)
    }

    pub fn set_last_player_name(&mut self, name: &str) -> PuzzleResult<()> {
        write_json(&mut *self.store, LAST_PLAYER_NAME_KEY, &display_player_name(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayLink {
    pub puzzle_id: String,
    pub token: Option<String>,
}

/// `<base>#play?pid=<id>`, plus `&t=<token>` for link-only puzzles.
pub fn share_link(base: &Url, record: &PuzzleRecord) -> Url {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("pid", &record.id);
    if record.visibility == Visibility::Link {
        if let Some(token) = record.token.as_deref() {
            query.append_pair("t", token);
        }
    }
    let mut url = base.clone();
    url.set_fragment(Some(&format!("play?{}", query.finish())));
    url
}

/// Accepts a full share URL or just its `#play?...` fragment.
pub fn parse_play_link(link: &str) -> Option<PlayLink> {
    let trimmed = link.trim();
    let fragment = match Url::parse(trimmed) {
        Ok(url) => url.fragment()?.to_string(),
        Err(_) => trimmed.strip_prefix('#').unwrap_or(trimmed).to_string(),
    };
    let rest = fragment.strip_prefix("play")?;
    let query = rest.strip_prefix('?').unwrap_or("");
    let mut puzzle_id = None;
    let mut token = None;
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "pid" if !value.is_empty() => puzzle_id = Some(value.into_owned()),
            "t" if !value.is_empty() => token = Some(value.into_owned()),
            _ => {}
        }
    }
    Some(PlayLink {
        puzzle_id: puzzle_id?,
        token,
    })
}
