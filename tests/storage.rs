use fmhdist::cmd::ComputeParameters;
use fmhdist::sketch::Sketch;
use fmhdist::storage::{load_sketch, save_sketch, FSStorage, MemStorage, Storage};

const SEQ: &[u8] = b">x\nACGTTGCATGCATCGATCGACTAGCATCGACTTTGACCATGACCGATT\n";

fn sketch() -> Sketch {
    let params = ComputeParameters::builder()
        .ksize(9u32)
        .scaled(1u32)
        .build();
    Sketch::from_sequence(Some("GCF_000005845".into()), SEQ, &params).unwrap()
}

fn roundtrip(storage: &dyn Storage) -> Result<(), Box<dyn std::error::Error>> {
    let original = sketch();
    let key = save_sketch(storage, "GCF_000005845", &original)?;
    assert_eq!(key, "GCF_000005845");

    let raw = storage.load(&key)?;
    assert_eq!(String::from_utf8(raw)?, original.to_hex()?);

    let loaded = load_sketch(storage, &key)?;
    assert_eq!(loaded, original);
    Ok(())
}

#[test]
fn memory_storage() -> Result<(), Box<dyn std::error::Error>> {
    let storage = MemStorage::new();
    roundtrip(&storage)?;
    assert_eq!(storage.len(), 1);
    Ok(())
}

#[test]
fn filesystem_storage() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let storage = FSStorage::new(dir.path());
    roundtrip(&storage)?;
    assert!(dir.path().join("GCF_000005845").exists());
    Ok(())
}

#[test]
fn corrupted_entry() {
    let storage = MemStorage::new();
    storage.save("broken", b"deadbeef").unwrap();
    assert!(load_sketch(&storage, "broken").is_err());
    assert!(load_sketch(&storage, "absent").is_err());
}
