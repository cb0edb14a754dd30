use super::*;
use crate::config::{LoadOptions, StartOptions};
use crate::runtime::Scenario;
use crate::value::WaitFor;

fn sample_snapshot() -> ScenarioSnapshot {
    let mut scenario = Scenario::default();
    scenario
        .load("#label,top\n250\n#goto,top", None, &LoadOptions::default())
        .expect("script should load");
    assert!(scenario.start(&StartOptions::default()));
    scenario.update(100.0);
    scenario.to_json()
}

#[test]
fn binary_roundtrip_keeps_snapshot() {
    let save = SaveData::new(sample_snapshot());
    let encoded = save.to_binary().expect("encode");
    assert_eq!(&encoded[0..4], &SAVE_BINARY_MAGIC);
    let decoded = SaveData::from_binary(&encoded).expect("decode");
    assert_eq!(decoded, save);
    assert_eq!(decoded.snapshot.wait, Some(WaitFor::Delay(250.0)));
    assert_eq!(decoded.snapshot.timer, Some(150.0));
}

#[test]
fn rejects_short_and_foreign_input() {
    assert_eq!(SaveData::from_binary(b"CSV"), Err(SaveError::TooSmall));
    let mut encoded = SaveData::new(sample_snapshot()).to_binary().unwrap();
    encoded[0] = b'X';
    assert_eq!(SaveData::from_binary(&encoded), Err(SaveError::InvalidMagic));
}

#[test]
fn rejects_other_format_versions() {
    let mut encoded = SaveData::new(sample_snapshot()).to_binary().unwrap();
    let bumped = SAVE_FORMAT_VERSION + 1;
    encoded[4..6].copy_from_slice(&bumped.to_le_bytes());
    assert_eq!(
        SaveData::from_binary(&encoded),
        Err(SaveError::IncompatibleVersion {
            found: bumped,
            expected: SAVE_FORMAT_VERSION,
        })
    );
}

#[test]
fn detects_tampering() {
    let mut encoded = SaveData::new(sample_snapshot()).to_binary().unwrap();
    let last = encoded.len() - 2;
    encoded[last] ^= 0x01;
    assert_eq!(
        SaveData::from_binary(&encoded),
        Err(SaveError::ChecksumMismatch)
    );

    let mut truncated = SaveData::new(sample_snapshot()).to_binary().unwrap();
    truncated.pop();
    assert_eq!(
        SaveData::from_binary(&truncated),
        Err(SaveError::LengthMismatch)
    );
}

#[test]
fn file_roundtrip_creates_parent_dirs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("slots").join("quick.csvs");
    let save = SaveData::new(sample_snapshot());
    save.write_to(&path).expect("write save");
    assert_eq!(SaveData::read_from(&path).expect("read save"), save);

    let missing = dir.path().join("nope.csvs");
    assert!(matches!(
        SaveData::read_from(&missing),
        Err(SaveError::Io(_))
    ));
}
