use fwpkg_core::producer::PackageWriter;
use fwpkg_core::FirmwarePackageConsumer;
use proptest::prelude::*;
use serde_json::{json, Value};

const ORDER: [&str; 5] = ["name", "version", "file", "compatibility.hw", "compatibility.major_revs"];

/// Full manifest with the keys flagged in `drop` removed. `empty` selects
/// whether a dropped key is deleted outright or set to an empty value.
fn manifest_json(drop: [bool; 5], empty: bool) -> Value {
    let mut m = json!({
        "name": "fw1",
        "version": "1.0",
        "file": "image.bin",
        "compatibility": { "hw": "boardA", "major_revs": ["1", "2"] },
        "release_notes": "opaque"
    });
    for (i, key) in ORDER.iter().enumerate() {
        if !drop[i] {
            continue;
        }
        let (obj, leaf) = match key.split_once('.') {
            Some((_, leaf)) => (m["compatibility"].as_object_mut().unwrap(), leaf),
            None => (m.as_object_mut().unwrap(), *key),
        };
        if empty {
            let blank = if leaf == "major_revs" { json!([]) } else { json!("") };
            obj.insert(leaf.to_string(), blank);
        } else {
            obj.remove(leaf);
        }
    }
    m
}

fn package(manifest: &Value) -> Vec<u8> {
    let json = serde_json::to_vec(manifest).unwrap();
    let mut w = PackageWriter::new(Vec::new());
    w.append_entry("./manifest.json", json.len() as u64, json.as_slice()).unwrap();
    w.append_entry("./image.bin", 3, &b"bin"[..]).unwrap();
    w.finish().unwrap()
}

proptest! {
    #[test]
    fn first_missing_field_is_reported(drop in any::<[bool; 5]>(), empty in any::<bool>()) {
        let tar = package(&manifest_json(drop, empty));
        let res = FirmwarePackageConsumer::from_bytes(tar);
        match drop.iter().position(|d| *d) {
            None => prop_assert!(res.is_ok()),
            Some(first) => {
                let err = res.unwrap_err();
                prop_assert_eq!(err.missing_field(), Some(ORDER[first]));
                prop_assert_eq!(
                    err.to_string(),
                    format!("error in manifest: missing \"{}\" in manifest", ORDER[first])
                );
            }
        }
    }
}
