//! Record key classification.
//!
//! Chunk-scoped keys are `x:i32le, z:i32le[, dimension:i32le], code:u8[, sub_chunk:i8]`,
//! so their length alone tells the shape apart: 9 and 10 bytes for the
//! overworld, 13 and 14 bytes for any other dimension. Every other key is
//! textual, or a textual prefix followed by binary IDs.

use byteorder::{ByteOrder, LittleEndian};
use lodestone_common::{ChunkCoords, Dimension, LodestoneError, Result};
use tracing::warn;
use uuid::Uuid;

const MAP_PREFIX: &[u8] = b"map_";
const PLAYER_PREFIX: &[u8] = b"player_";
const ACTOR_PREFIX: &[u8] = b"actorprefix";
const ACTOR_DIGEST_PREFIX: &[u8] = b"digp";

macro_rules! content_types {
    (
        chunk { $($chunk:ident = $code:literal),* $(,)? }
        other { $($other:ident),* $(,)? }
    ) => {
        /// What a record in a world database holds, derived from its key.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ContentType {
            $($chunk,)*
            $($other,)*
            Unknown,
        }

        impl ContentType {
            /// Every content type, chunk-scoped ones first.
            pub const ALL: &'static [ContentType] = &[
                $(ContentType::$chunk,)*
                $(ContentType::$other,)*
                ContentType::Unknown,
            ];

            /// Code byte used in chunk keys.
            pub fn chunk_code(self) -> Option<u8> {
                match self {
                    $(ContentType::$chunk => Some($code),)*
                    _ => None,
                }
            }

            pub fn from_chunk_code(code: u8) -> Option<Self> {
                match code {
                    $($code => Some(ContentType::$chunk),)*
                    _ => None,
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(ContentType::$chunk => stringify!($chunk),)*
                    $(ContentType::$other => stringify!($other),)*
                    ContentType::Unknown => "Unknown",
                }
            }
        }
    };
}

content_types! {
    chunk {
        Data3D = 0x2B,
        Version = 0x2C,
        Data2D = 0x2D,
        LegacyData2D = 0x2E,
        SubChunkPrefix = 0x2F,
        LegacyTerrain = 0x30,
        BlockEntity = 0x31,
        Entity = 0x32,
        PendingTicks = 0x33,
        LegacyBlockExtraData = 0x34,
        BiomeState = 0x35,
        FinalizedState = 0x36,
        ConversionData = 0x37,
        BorderBlocks = 0x38,
        HardcodedSpawners = 0x39,
        RandomTicks = 0x3A,
        Checksums = 0x3B,
        GenerationSeed = 0x3C,
        GeneratedPreCavesAndCliffsBlending = 0x3D,
        BlendingBiomeHeight = 0x3E,
        MetaDataHash = 0x3F,
        BlendingData = 0x40,
        ActorDigestVersion = 0x41,
        LegacyVersion = 0x76,
        AabbVolumes = 0x77,
    }
    other {
        ActorDigest,
        Actor,
        LocalPlayer,
        Player,
        LegacyPlayer,
        ServerPlayer,
        Map,
        Portals,
        Scoreboard,
        WanderingTraderScheduler,
        BiomeData,
        MobEvents,
        LegacyOverworld,
        LegacyNether,
        LegacyTheEnd,
        AutonomousEntities,
        LevelChunkMetaDataDictionary,
        PositionTrackingDb,
        PositionTrackingLastId,
        FlatWorldLayers,
        LevelSpawnWasFixed,
        IdCounts,
        MVillages,
        Villages,
        LegacyDimension0,
        LegacyDimension1,
        LegacyDimension2,
        TickingArea,
        StructureTemplate,
        DynamicProperties,
        RealmsStoriesData,
        VillageDwellers,
        VillageInfo,
        VillagePoi,
        VillagePlayers,
    }
}

impl ContentType {
    /// Classifies a raw key. Keys matching no known shape are `Unknown`.
    pub fn classify(key: &[u8]) -> ContentType {
        if let Some((content_type, _)) = parse_chunk_key(key) {
            return content_type;
        }
        if key.starts_with(ACTOR_DIGEST_PREFIX) && parse_digest_key(key).is_some() {
            return ContentType::ActorDigest;
        }
        if key.len() == ACTOR_PREFIX.len() + 8 && key.starts_with(ACTOR_PREFIX) {
            return ContentType::Actor;
        }
        if let Some(content_type) = Self::ALL
            .iter()
            .copied()
            .find(|ty| ty.literal_key() == Some(key))
        {
            return content_type;
        }
        match std::str::from_utf8(key) {
            Ok(text) => classify_text(text),
            Err(_) => ContentType::Unknown,
        }
    }

    /// The whole key of types stored under one fixed key.
    pub fn literal_key(self) -> Option<&'static [u8]> {
        Some(match self {
            ContentType::LocalPlayer => b"~local_player",
            ContentType::Portals => b"portals",
            ContentType::Scoreboard => b"scoreboard",
            ContentType::WanderingTraderScheduler => b"schedulerWT",
            ContentType::BiomeData => b"BiomeData",
            ContentType::MobEvents => b"mobevents",
            ContentType::LegacyOverworld => b"Overworld",
            ContentType::LegacyNether => b"Nether",
            ContentType::LegacyTheEnd => b"TheEnd",
            ContentType::AutonomousEntities => b"AutonomousEntities",
            ContentType::LevelChunkMetaDataDictionary => b"LevelChunkMetaDataDictionary",
            ContentType::PositionTrackingLastId => b"PositionTrackDB-LastId",
            ContentType::FlatWorldLayers => b"game_flatworldlayers",
            ContentType::LevelSpawnWasFixed => b"LevelSpawnWasFixed",
            ContentType::IdCounts => b"idcounts",
            ContentType::MVillages => b"mVillages",
            ContentType::Villages => b"villages",
            ContentType::LegacyDimension0 => b"dimension0",
            ContentType::LegacyDimension1 => b"dimension1",
            ContentType::LegacyDimension2 => b"dimension2",
            ContentType::DynamicProperties => b"DynamicProperties",
            ContentType::RealmsStoriesData => b"realmsStoriesData",
            _ => return None,
        })
    }

    /// Shared label of related content types.
    pub fn group(self) -> Option<&'static str> {
        match self {
            ContentType::LegacyOverworld | ContentType::LegacyNether | ContentType::LegacyTheEnd => {
                Some("LegacyDimension")
            }
            ContentType::LegacyDimension0
            | ContentType::LegacyDimension1
            | ContentType::LegacyDimension2 => Some("LegacyDimensionData"),
            ContentType::MVillages | ContentType::Villages => Some("LegacyVillage"),
            ContentType::VillageDwellers
            | ContentType::VillageInfo
            | ContentType::VillagePoi
            | ContentType::VillagePlayers => Some("Village"),
            ContentType::Player | ContentType::LegacyPlayer | ContentType::ServerPlayer => {
                Some("Player")
            }
            _ => None,
        }
    }

    /// Whether keys of this type carry a chunk position.
    pub fn is_chunk_scoped(self) -> bool {
        self.chunk_code().is_some() || self == ContentType::ActorDigest
    }
}

fn read_i32_le(bytes: &[u8], offset: usize) -> i32 {
    LittleEndian::read_i32(&bytes[offset..offset + 4])
}

/// Reads `x, z[, dimension]` from the front of a chunk position.
fn read_position(bytes: &[u8], with_dimension: bool) -> ChunkCoords {
    let dimension = if with_dimension {
        Dimension::from_id(read_i32_le(bytes, 8))
    } else {
        Dimension::Overworld
    };
    ChunkCoords::new(read_i32_le(bytes, 0), read_i32_le(bytes, 4), dimension)
}

fn parse_chunk_key(key: &[u8]) -> Option<(ContentType, ChunkCoords)> {
    if key.starts_with(MAP_PREFIX) || key.starts_with(PLAYER_PREFIX) {
        return None;
    }
    let (with_dimension, has_sub_chunk) = match key.len() {
        9 => (false, false),
        10 => (false, true),
        13 => (true, false),
        14 => (true, true),
        _ => return None,
    };
    let code_at = if has_sub_chunk { key.len() - 2 } else { key.len() - 1 };
    let content_type = ContentType::from_chunk_code(key[code_at])?;

    let mut coords = read_position(key, with_dimension);
    if has_sub_chunk {
        coords = coords.with_sub_chunk(key[key.len() - 1] as i8);
    }
    Some((content_type, coords))
}

fn parse_digest_key(key: &[u8]) -> Option<ChunkCoords> {
    let position = key.strip_prefix(ACTOR_DIGEST_PREFIX)?;
    match position.len() {
        8 => Some(read_position(position, false)),
        12 => Some(read_position(position, true)),
        _ => None,
    }
}

fn is_uuid(text: &str) -> bool {
    text.len() == 36 && Uuid::parse_str(text).is_ok()
}

fn is_village_id(text: &str) -> bool {
    is_uuid(text) || (text.len() == 16 && text.bytes().all(|b| b.is_ascii_hexdigit()))
}

fn classify_village(text: &str) -> Option<ContentType> {
    let rest = text.strip_prefix("VILLAGE_")?;
    let (id_part, kind) = rest.rsplit_once('_')?;
    let content_type = match kind {
        "DWELLERS" => ContentType::VillageDwellers,
        "INFO" => ContentType::VillageInfo,
        "POI" => ContentType::VillagePoi,
        "PLAYERS" => ContentType::VillagePlayers,
        _ => return None,
    };
    let id = match id_part.split_once('_') {
        Some((dimension, id)) => {
            Dimension::from_key_name(dimension)?;
            id
        }
        None => id_part,
    };
    is_village_id(id).then_some(content_type)
}

fn classify_text(text: &str) -> ContentType {
    if let Some(content_type) = classify_village(text) {
        return content_type;
    }
    if let Some(id) = text.strip_prefix("map_") {
        if id.parse::<i64>().is_ok() {
            return ContentType::Map;
        }
    }
    if let Some(id) = text.strip_prefix("player_server_") {
        if is_uuid(id) {
            return ContentType::ServerPlayer;
        }
    }
    if let Some(id) = text.strip_prefix("player_") {
        if is_uuid(id) {
            return ContentType::Player;
        }
        if id.parse::<i64>().is_ok() {
            return ContentType::LegacyPlayer;
        }
    }
    if let Some(id) = text.strip_prefix("tickingarea_") {
        if is_uuid(id) {
            return ContentType::TickingArea;
        }
    }
    if let Some(identifier) = text.strip_prefix("structuretemplate_") {
        if let Some((namespace, name)) = identifier.split_once(':') {
            if !namespace.is_empty() && !name.is_empty() {
                return ContentType::StructureTemplate;
            }
        }
    }
    if let Some(id) = text.strip_prefix("PosTrackDB-0x") {
        if u32::from_str_radix(id, 16).is_ok() {
            return ContentType::PositionTrackingDb;
        }
    }
    ContentType::Unknown
}

/// Chunk position of a chunk-scoped key, or `None` for any other key.
pub fn chunk_coordinates(key: &[u8]) -> Option<ChunkCoords> {
    let coords = match parse_chunk_key(key) {
        Some((_, coords)) => coords,
        None if key.starts_with(ACTOR_DIGEST_PREFIX) => parse_digest_key(key)?,
        None => return None,
    };
    if let Dimension::Custom(id) = coords.dimension {
        warn!(dimension = id, x = coords.x, z = coords.z, "chunk key in unknown dimension");
    }
    Some(coords)
}

/// Builds the key of a chunk-scoped record.
///
/// The dimension field is omitted for the overworld. The sub-chunk byte is
/// appended only when `coords.sub_chunk` is set.
pub fn build_chunk_key(coords: ChunkCoords, content_type: ContentType) -> Result<Vec<u8>> {
    let with_dimension = coords.dimension.id() != 0;
    let mut key = Vec::with_capacity(
        ACTOR_DIGEST_PREFIX.len() + 8 + 4 * with_dimension as usize + 2,
    );

    let code = match content_type.chunk_code() {
        Some(code) => Some(code),
        None if content_type == ContentType::ActorDigest => {
            if coords.sub_chunk.is_some() {
                return Err(LodestoneError::Validation(
                    "actor digest keys have no sub-chunk index".to_string(),
                ));
            }
            key.extend_from_slice(ACTOR_DIGEST_PREFIX);
            None
        }
        None => return Err(LodestoneError::NotChunkScoped(content_type.name())),
    };

    key.extend_from_slice(&coords.x.to_le_bytes());
    key.extend_from_slice(&coords.z.to_le_bytes());
    if with_dimension {
        key.extend_from_slice(&coords.dimension.id().to_le_bytes());
    }
    if let Some(code) = code {
        key.push(code);
        if let Some(sub_chunk) = coords.sub_chunk {
            key.push(sub_chunk as u8);
        }
    }
    Ok(key)
}
