mod common;

use assert_matches::assert_matches;
use common::*;
use lodestone::chunk::{ActorDigestRecord, BlockLayer, SubChunkRecord};
use lodestone::{
    chunk_coordinates, decode_entry, encode_entry, read_record, records_of_type, CodecOptions,
    ContentType, Dimension, LodestoneError, MemoryStore, Record, RecordVariant, WorldStore,
};

fn entries(store: &MemoryStore) -> Vec<(Vec<u8>, Vec<u8>)> {
    store.entries().collect::<lodestone::Result<_>>().unwrap()
}

#[test]
fn test_every_fixture_record_round_trips() {
    let store = world_fixture();
    let options = CodecOptions::default();
    for (key, value) in entries(&store) {
        let entry = decode_entry(&key, &value, &options).unwrap();
        let encoded = encode_entry(&key, &entry.record, &options).unwrap();
        assert_eq!(
            encoded,
            value,
            "{} did not round trip",
            entry.content_type.name()
        );
    }
}

#[test]
fn test_fixture_classification() {
    let store = world_fixture();
    let mut counts = std::collections::BTreeMap::new();
    for key in store.keys() {
        *counts
            .entry(ContentType::classify(&key.unwrap()))
            .or_insert(0usize) += 1;
    }
    assert_eq!(counts[&ContentType::Version], 2);
    assert_eq!(counts[&ContentType::SubChunkPrefix], 3);
    assert_eq!(counts[&ContentType::Data3D], 1);
    assert_eq!(counts[&ContentType::ActorDigest], 1);
    assert_eq!(counts[&ContentType::Actor], 1);
    assert_eq!(counts[&ContentType::LocalPlayer], 1);
    assert_eq!(counts[&ContentType::ServerPlayer], 1);
    assert_eq!(counts[&ContentType::VillageInfo], 1);
    assert_eq!(counts[&ContentType::FlatWorldLayers], 1);
    assert_eq!(counts[&ContentType::Unknown], 1);
}

#[test]
fn test_sub_chunks_by_dimension() {
    let store = world_fixture();
    let options = CodecOptions::default();
    let sub_chunks: Vec<_> = records_of_type(&store, ContentType::SubChunkPrefix, &options)
        .collect::<lodestone::Result<_>>()
        .unwrap();
    assert_eq!(sub_chunks.len(), 3);

    let nether: Vec<_> = sub_chunks
        .iter()
        .filter(|entry| entry.coords.map(|c| c.dimension) == Some(Dimension::Nether))
        .collect();
    assert_eq!(nether.len(), 1);
    assert_eq!(nether[0].coords.unwrap().x, -1);

    for entry in &sub_chunks {
        let record = SubChunkRecord::from_record(&entry.record).unwrap();
        assert_eq!(record.sub_chunk_index(), entry.coords.unwrap().sub_chunk);
    }
}

fn name_at(layer: &BlockLayer, x: usize, y: usize, z: usize) -> Option<&str> {
    layer.block_at(x, y, z).and_then(|state| state.name())
}

#[test]
fn test_waterlogged_sub_chunk() {
    let store = world_fixture();
    let key = sub_chunk_key(0, 0, Dimension::Overworld, 4);
    let entry = read_record(&store, &key, &CodecOptions::default())
        .unwrap()
        .unwrap();
    let record = SubChunkRecord::from_record(&entry.record).unwrap();

    let [terrain, liquid] = record.layers() else {
        panic!("expected two layers, found {}", record.layers().len());
    };
    assert_eq!(name_at(terrain, 0, 0, 0), Some("minecraft:stone"));
    assert_eq!(name_at(terrain, 0, 1, 0), Some("minecraft:stone"));
    assert_eq!(name_at(terrain, 0, 2, 0), Some("minecraft:air"));
    assert_eq!(name_at(terrain, 15, 15, 15), Some("minecraft:stone"));
    assert_eq!(name_at(liquid, 0, 1, 0), Some("minecraft:water"));
    assert_eq!(name_at(liquid, 0, 0, 0), Some("minecraft:air"));
}

#[test]
fn test_negative_sub_chunk_index() {
    let key = sub_chunk_key(0, 0, Dimension::Overworld, -4);
    assert_eq!(key[9], 0xFC);
    assert_eq!(chunk_coordinates(&key).unwrap().sub_chunk, Some(-4));

    let store = world_fixture();
    let entry = read_record(&store, &key, &CodecOptions::default())
        .unwrap()
        .unwrap();
    let record = SubChunkRecord::from_record(&entry.record).unwrap();
    assert_eq!(record.sub_chunk_index(), Some(-4));
    assert_eq!(record.layers()[0].palette[0].name(), Some("minecraft:stone"));
}

#[test]
fn test_data3d_from_store() {
    let store = world_fixture();
    let options = CodecOptions::default();
    let entries: Vec<_> = records_of_type(&store, ContentType::Data3D, &options)
        .collect::<lodestone::Result<_>>()
        .unwrap();
    let Record::Data3D(record) = &entries[0].record else {
        panic!("expected a Data3D record");
    };
    assert_eq!(record.height(7, 7), Some(70));
    assert_eq!(record.biomes.len(), 24);
    assert_eq!(record.biome_at(3, 20, 3, 3), Some(1));
}

#[test]
fn test_actor_digest_points_at_actors() {
    let store = world_fixture();
    let options = CodecOptions::default();
    let digests: Vec<_> = records_of_type(&store, ContentType::ActorDigest, &options)
        .collect::<lodestone::Result<_>>()
        .unwrap();
    assert_eq!(digests.len(), 1);
    assert_eq!(digests[0].coords.unwrap().dimension, Dimension::Nether);

    let digest = ActorDigestRecord::from_record(&digests[0].record).unwrap();
    for actor_key in digest.actor_keys() {
        let actor = read_record(&store, &actor_key, &options).unwrap().unwrap();
        assert_eq!(actor.content_type, ContentType::Actor);
        let tags = actor.record.as_tag_trees().unwrap();
        assert_eq!(
            tags[0].tag.as_compound().unwrap()["identifier"].as_string(),
            Some("minecraft:ghast")
        );
    }
}

#[test]
fn test_entities_are_concatenated_trees() {
    let store = world_fixture();
    let options = CodecOptions::default();
    let entities: Vec<_> = records_of_type(&store, ContentType::Entity, &options)
        .collect::<lodestone::Result<_>>()
        .unwrap();
    assert_eq!(entities[0].record.as_tag_trees().unwrap().len(), 2);
}

#[test]
fn test_corrupt_records_do_not_stop_iteration() {
    let mut store = world_fixture();
    let mut truncated = sub_chunk_v9(1, &[uniform_layer(&block("minecraft:dirt"))]);
    truncated.truncate(40);
    store.put(sub_chunk_key(3, 3, Dimension::Overworld, 1), truncated);
    store.put(
        sub_chunk_key(4, 4, Dimension::Overworld, 1),
        vec![0x0C, 0x01, 0x01],
    );

    let options = CodecOptions::default();
    let results: Vec<_> = records_of_type(&store, ContentType::SubChunkPrefix, &options).collect();
    assert_eq!(results.len(), 5);

    let failures: Vec<&LodestoneError> = results.iter().filter_map(|r| r.as_ref().err()).collect();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures.iter().filter(|e| e.is_truncation()).count(), 1);
    assert_eq!(
        failures.iter().filter(|e| e.is_unsupported_version()).count(),
        1
    );
    assert_matches!(failures[0], LodestoneError::Record { .. });
}

#[test]
fn test_text_and_unknown_records() {
    let store = world_fixture();
    let options = CodecOptions::default();
    let layers = read_record(&store, b"game_flatworldlayers", &options)
        .unwrap()
        .unwrap();
    assert!(layers.record.as_text().unwrap().contains("block_layers"));

    let unknown = read_record(&store, b"totally unknown", &options)
        .unwrap()
        .unwrap();
    assert_eq!(unknown.content_type, ContentType::Unknown);
    assert_eq!(unknown.record, Record::Opaque(vec![1, 2, 3]));
    assert_eq!(unknown.coords, None);
}

#[test]
fn test_canonical_options_from_json() {
    let options = CodecOptions::from_json_str(r#"{ "preserve_storage_version": false }"#).unwrap();
    let store = world_fixture();
    let key = sub_chunk_key(0, 0, Dimension::Overworld, 4);
    let value = store.get(&key).unwrap().unwrap();
    let entry = decode_entry(&key, &value, &options).unwrap();
    assert_eq!(encode_entry(&key, &entry.record, &options).unwrap(), value);
}
