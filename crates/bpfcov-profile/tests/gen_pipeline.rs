//! Profile generation against in-memory maps and empty pin directories.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashMap;
use std::fs::Permissions;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use bpfcov_common::config::{CovConfig, PinPaths};
use bpfcov_common::constants::PROFRAW_MAGIC;
use bpfcov_common::error::{CovError, Result};
use bpfcov_common::types::{MapMeta, MapRole};
use bpfcov_ebpf::maps::MapAccess;
use bpfcov_profile::profile::{Profile, generate, write_profile};
use bpfcov_profile::source::MapSource;

#[derive(Clone)]
struct MemoryMap {
    path: PathBuf,
    meta: MapMeta,
    value: Option<Vec<u8>>,
}

impl MapAccess for MemoryMap {
    fn location(&self) -> &Path {
        &self.path
    }

    fn meta(&self) -> MapMeta {
        self.meta
    }

    fn first_key(&self) -> io::Result<Option<Vec<u8>>> {
        Ok(self.value.as_ref().map(|_| vec![0u8; 4]))
    }

    fn lookup(&self, _key: &[u8]) -> io::Result<Option<Vec<u8>>> {
        Ok(self.value.clone())
    }
}

#[derive(Default)]
struct MemorySource {
    maps: HashMap<MapRole, MemoryMap>,
}

impl MemorySource {
    fn with(mut self, role: MapRole, value: Vec<u8>) -> Self {
        let meta = MapMeta {
            id: u32::try_from(role.index()).unwrap() + 10,
            key_size: 4,
            value_size: u32::try_from(value.len()).unwrap(),
            max_entries: 1,
        };
        let map = MemoryMap {
            path: PathBuf::from(format!("/sys/fs/bpf/cov/prog/{role}")),
            meta,
            value: Some(value),
        };
        let _ = self.maps.insert(role, map);
        self
    }

    fn standard(version: u32) -> Self {
        let mut covmap = vec![0u8; 16];
        covmap[12..16].copy_from_slice(&version.to_le_bytes());
        Self::default()
            .with(MapRole::Data, (0u8..48).collect())
            .with(MapRole::Counters, vec![0xaa; 8])
            .with(MapRole::Names, b"func_name_zlib!!".to_vec())
            .with(MapRole::CovMap, covmap)
    }
}

impl MapSource for MemorySource {
    type Map = MemoryMap;

    fn open(&self, role: MapRole) -> Result<MemoryMap> {
        self.maps.get(&role).cloned().ok_or_else(|| CovError::MissingPin {
            path: PathBuf::from(format!("/sys/fs/bpf/cov/prog/{role}")),
        })
    }
}

fn field(bytes: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap())
}

#[test]
fn single_function_profile_is_144_bytes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("prog.profraw");
    let profile = Profile::collect(&MemorySource::standard(0), false).expect("collect");

    let written = write_profile(&out, &profile).expect("write");
    let bytes = std::fs::read(&out).expect("read");

    assert_eq!(written, 144);
    assert_eq!(bytes.len(), 144);
    assert_eq!(field(&bytes, 0), PROFRAW_MAGIC);
    assert_eq!(field(&bytes, 8), 1);
    assert_eq!(field(&bytes, 16), 1);
    assert_eq!(field(&bytes, 32), 1);
    assert_eq!(field(&bytes, 48), 16);
    assert_eq!(field(&bytes, 56), 16);
    assert_eq!(&bytes[88..136], (0u8..48).collect::<Vec<_>>().as_slice());
    assert_eq!(&bytes[136..144], &[0xaa; 8]);
}

#[test]
fn header_counts_follow_map_sizes() {
    let source = MemorySource::standard(5)
        .with(MapRole::Data, vec![0; 96])
        .with(MapRole::Counters, vec![0; 80]);
    let profile = Profile::collect(&source, false).expect("collect");

    assert_eq!(profile.header.version, 6);
    assert_eq!(profile.header.data_count, 2);
    assert_eq!(profile.header.counters_count, 10);
    assert_eq!(profile.byte_len(), 88 + 96 + 80);
}

#[test]
fn names_section_is_opt_in_and_padded() {
    let source = MemorySource::standard(0).with(MapRole::Names, b"abcde".to_vec());
    let profile = Profile::collect(&source, true).expect("collect");

    let mut bytes = Vec::new();
    profile.write_to(&mut bytes).expect("write");

    assert_eq!(bytes.len(), 88 + 48 + 8 + 8);
    assert_eq!(&bytes[144..149], b"abcde");
    assert_eq!(&bytes[149..152], &[0, 0, 0]);
    assert_eq!(field(&bytes, 48), 5);
}

#[test]
fn missing_role_fails_before_output_is_created() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut source = MemorySource::standard(0);
    let _ = source.maps.remove(&MapRole::Names);

    let err = Profile::collect(&source, false).unwrap_err();
    assert!(matches!(err, CovError::MissingPin { .. }));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn empty_singleton_is_fatal() {
    let mut source = MemorySource::standard(0);
    source.maps.get_mut(&MapRole::Counters).unwrap().value = None;
    assert!(matches!(
        Profile::collect(&source, false),
        Err(CovError::EmptyMap { .. })
    ));
}

#[test]
fn write_replaces_existing_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("prog.profraw");
    std::fs::write(&out, vec![0xff; 4096]).expect("seed");

    let profile = Profile::collect(&MemorySource::standard(0), false).expect("collect");
    let _ = write_profile(&out, &profile).expect("write");

    assert_eq!(std::fs::metadata(&out).unwrap().len(), 144);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn write_keeps_mode_of_replaced_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("prog.profraw");
    std::fs::write(&out, b"old").expect("seed");
    std::fs::set_permissions(&out, Permissions::from_mode(0o600)).expect("chmod");

    let profile = Profile::collect(&MemorySource::standard(0), false).expect("collect");
    let _ = write_profile(&out, &profile).expect("write");

    let mode = std::fs::metadata(&out).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
}

#[test]
fn new_output_mode_follows_umask() {
    let status = std::fs::read_to_string("/proc/self/status").expect("status");
    let umask = status
        .lines()
        .find_map(|l| l.strip_prefix("Umask:"))
        .map(|v| u32::from_str_radix(v.trim(), 8).expect("octal umask"))
        .expect("umask line");
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("prog.profraw");

    let profile = Profile::collect(&MemorySource::standard(0), false).expect("collect");
    let _ = write_profile(&out, &profile).expect("write");

    let mode = std::fs::metadata(&out).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o666 & !umask);
}

#[test]
fn generate_without_pins_writes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("prog.profraw");
    let config = CovConfig {
        bpffs: dir.path().to_path_buf(),
        program: vec!["prog".into()],
        output: Some(out.clone()),
        pins: PinPaths::under(&dir.path().join("cov").join("prog")),
        verbosity: 0,
        include_names: false,
    };

    let err = generate(&config).unwrap_err();
    assert!(matches!(err, CovError::MissingPin { .. }));
    assert!(!out.exists());
}

#[test]
fn generate_requires_output_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = CovConfig {
        bpffs: dir.path().to_path_buf(),
        program: vec!["prog".into()],
        output: None,
        pins: PinPaths::under(dir.path()),
        verbosity: 0,
        include_names: false,
    };
    assert!(matches!(generate(&config), Err(CovError::Config { .. })));
}
