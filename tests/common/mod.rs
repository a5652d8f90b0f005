#![allow(dead_code)]

use lodestone::chunk::BlockState;
use lodestone::nbt::{self, Compound, NamedTag, NbtFlavor, Tag};
use lodestone::{build_chunk_key, ChunkCoords, ContentType, Dimension, MemoryStore};

pub const PLAYER_UUID: &str = "5f3c2a10-9e4b-4c7d-8a61-0b2c3d4e5f60";
pub const ACTOR_ID: [u8; 8] = [0, 0, 0, 1, 0, 0, 0, 7];

pub fn block(name: &str) -> BlockState {
    BlockState::new(name, Compound::new(), 17_959_425)
}

pub fn le_tag(tag: &NamedTag) -> Vec<u8> {
    nbt::to_vec(NbtFlavor::LittleEndian, tag).unwrap()
}

pub fn compound(fields: &[(&str, Tag)]) -> NamedTag {
    let mut compound = Compound::new();
    for (name, tag) in fields {
        compound.insert(name.to_string(), tag.clone());
    }
    NamedTag::new("", Tag::Compound(compound))
}

pub fn chunk_key(x: i32, z: i32, dimension: Dimension, ty: ContentType) -> Vec<u8> {
    build_chunk_key(ChunkCoords::new(x, z, dimension), ty).unwrap()
}

pub fn sub_chunk_key(x: i32, z: i32, dimension: Dimension, index: i8) -> Vec<u8> {
    build_chunk_key(
        ChunkCoords::new(x, z, dimension).with_sub_chunk(index),
        ContentType::SubChunkPrefix,
    )
    .unwrap()
}

/// A one-bit layer: `palette[1]` at the listed cells, `palette[0]` elsewhere.
pub fn two_block_layer(cells: &[usize], palette: [&BlockState; 2]) -> Vec<u8> {
    let mut words = [0u32; 128];
    for &cell in cells {
        words[cell / 32] |= 1 << (cell % 32);
    }
    let mut bytes = vec![0x02];
    for word in words {
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    bytes.extend_from_slice(&2i32.to_le_bytes());
    for state in palette {
        bytes.extend(le_tag(state.as_tag()));
    }
    bytes
}

pub fn uniform_layer(state: &BlockState) -> Vec<u8> {
    let mut bytes = vec![0x02];
    bytes.extend(std::iter::repeat(0).take(128 * 4));
    bytes.extend_from_slice(&1i32.to_le_bytes());
    bytes.extend(le_tag(state.as_tag()));
    bytes
}

pub fn sub_chunk_v9(index: i8, layers: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = vec![0x09, layers.len() as u8, index as u8];
    for layer in layers {
        bytes.extend_from_slice(layer);
    }
    bytes
}

/// Height map at `height` everywhere and a single biome in the lowest slab.
pub fn data3d(height: i16, biome: i32) -> Vec<u8> {
    let mut bytes = Vec::new();
    for _ in 0..256 {
        bytes.extend_from_slice(&height.to_le_bytes());
    }
    bytes.push(0x01);
    bytes.extend_from_slice(&biome.to_le_bytes());
    bytes
}

/// A small world with one overworld chunk, one nether chunk and the usual
/// global records.
pub fn world_fixture() -> MemoryStore {
    let air = block("minecraft:air");
    let stone = block("minecraft:stone");
    let water = block("minecraft:water");

    let mut store = MemoryStore::new();
    let overworld = Dimension::Overworld;
    store.put(chunk_key(0, 0, overworld, ContentType::Version), vec![0x28]);
    store.put(
        chunk_key(0, 0, overworld, ContentType::FinalizedState),
        2i32.to_le_bytes().to_vec(),
    );
    store.put(chunk_key(0, 0, overworld, ContentType::Data3D), data3d(70, 1));
    store.put(
        sub_chunk_key(0, 0, overworld, -4),
        sub_chunk_v9(-4, &[uniform_layer(&stone)]),
    );
    store.put(
        sub_chunk_key(0, 0, overworld, 4),
        sub_chunk_v9(
            4,
            &[
                two_block_layer(&[0, 1, 4095], [&air, &stone]),
                two_block_layer(&[1], [&air, &water]),
            ],
        ),
    );
    store.put(
        chunk_key(0, 0, overworld, ContentType::Entity),
        [
            le_tag(&compound(&[("identifier", Tag::String("minecraft:cow".into()))])),
            le_tag(&compound(&[("identifier", Tag::String("minecraft:pig".into()))])),
        ]
        .concat(),
    );

    let nether = Dimension::Nether;
    store.put(chunk_key(-1, 2, nether, ContentType::Version), vec![0x28]);
    store.put(
        sub_chunk_key(-1, 2, nether, 0),
        sub_chunk_v9(0, &[uniform_layer(&block("minecraft:netherrack"))]),
    );
    store.put(chunk_key(-1, 2, nether, ContentType::ActorDigest), ACTOR_ID.to_vec());
    store.put(
        [b"actorprefix".as_slice(), ACTOR_ID.as_slice()].concat(),
        le_tag(&compound(&[("identifier", Tag::String("minecraft:ghast".into()))])),
    );

    store.put(
        b"~local_player".to_vec(),
        le_tag(&compound(&[("PlayerGameMode", Tag::Int(1))])),
    );
    store.put(
        format!("player_server_{}", PLAYER_UUID).into_bytes(),
        le_tag(&compound(&[("PlayerGameMode", Tag::Int(0))])),
    );
    store.put(
        format!("VILLAGE_Overworld_{}_INFO", PLAYER_UUID).into_bytes(),
        le_tag(&compound(&[("Tick", Tag::Long(12))])),
    );
    store.put(
        b"game_flatworldlayers".to_vec(),
        br#"{"biome_id":1,"block_layers":[],"encoding_version":6}"#.to_vec(),
    );
    store.put(b"totally unknown".to_vec(), vec![1, 2, 3]);
    store
}
