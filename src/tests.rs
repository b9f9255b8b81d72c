mod cli_parsing {
    use crate::cartridge::CartridgeType;
    use crate::cli::{Cli, Commands, PositionKind};
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_info_parsing() {
        let cli = Cli::try_parse_from(["tapeweave", "info", "adr50"]).unwrap();
        assert!(!cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Info {
                cartridge: CartridgeType::Adr50
            }
        ));
    }

    #[test]
    fn test_locate_parsing() {
        let cli = Cli::try_parse_from([
            "tapeweave", "-v", "locate", "30GB", "0x01000000", "--from", "hardware",
        ])
        .unwrap();
        assert!(cli.verbose);
        if let Commands::Locate {
            cartridge,
            value,
            from,
        } = cli.command
        {
            assert_eq!(cartridge, CartridgeType::Adr30);
            assert_eq!(value, "0x01000000");
            assert_eq!(from, PositionKind::Hardware);
        } else {
            panic!("expected locate");
        }

        let cli = Cli::try_parse_from(["tapeweave", "locate", "adr30", "5"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Locate {
                from: PositionKind::Logical,
                ..
            }
        ));
    }

    #[test]
    fn test_order_and_condense_parsing() {
        let cli = Cli::try_parse_from([
            "tapeweave", "order", "tape.json", "--physical", "--export", "out.json",
        ])
        .unwrap();
        if let Commands::Order {
            definition,
            physical,
            export,
        } = cli.command
        {
            assert_eq!(definition, PathBuf::from("tape.json"));
            assert!(physical);
            assert_eq!(export, Some(PathBuf::from("out.json")));
        } else {
            panic!("expected order");
        }

        let cli = Cli::try_parse_from(["tapeweave", "condense", "dumps", "out.bin", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Condense { physical: false, .. }
        ));
    }

    #[test]
    fn test_rejects_bad_arguments() {
        assert!(Cli::try_parse_from(["tapeweave", "info", "floppy"]).is_err());
        assert!(Cli::try_parse_from(["tapeweave", "locate", "adr30", "1", "--from", "sideways"]).is_err());
        assert!(Cli::try_parse_from(["tapeweave", "condense", "dumps"]).is_err());
    }
}

mod end_to_end {
    use crate::block::test_support::frame;
    use crate::block::DATA_SIZE;
    use crate::cartridge::CartridgeType;
    use crate::commands;
    use crate::definition::{TapeDefinition, CACHE_FILE_NAME};
    use crate::error::TapeError;
    use crate::position::PhysicalPosition;
    use std::io::Read;
    use std::path::Path;

    fn hw(logical: u32) -> u32 {
        PhysicalPosition::from_logical_block(CartridgeType::Adr30, logical)
            .unwrap()
            .to_hardware_address()
    }

    /// Two passes over an Adr30 tape. The first read logical 0..=2, the
    /// second started at 4 and carries no hardware positions. Logical 3 is
    /// never recovered. Logical 0 encodes as hardware address 0, which reads
    /// as a sentinel, so it too is placed from the counter.
    fn write_tape(dir: &Path, skip: &str) {
        let a: Vec<u8> = [frame(10, b"LIN4", hw(0)), frame(11, b"LIN4", hw(1)), frame(12, b"LIN4", hw(2))].concat();
        let b: Vec<u8> = [frame(14, b"LIN4", 0), frame(15, b"LIN4", 0)].concat();
        std::fs::write(dir.join("a.bin"), a).unwrap();
        std::fs::write(dir.join("b.bin"), b).unwrap();
        std::fs::write(
            dir.join("tape.json"),
            format!(
                r#"{{ "type": "adr30", "name": "e2e", "skip": "{}", "files": [{{ "file": "a.bin", "start": 0 }}, {{ "file": "b.bin", "start": 4 }}] }}"#,
                skip
            ),
        )
        .unwrap();
    }

    fn payload(fills: &[u8]) -> Vec<u8> {
        fills
            .iter()
            .flat_map(|f| std::iter::repeat(*f).take(DATA_SIZE))
            .collect()
    }

    #[test]
    fn test_map_caches_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        write_tape(dir.path(), "");

        let mut definition = TapeDefinition::load(dir.path()).unwrap();
        let (map, stats) = definition.load_block_map(false).unwrap();
        let stats = stats.unwrap();
        assert_eq!(map.len(), 5);
        assert_eq!(stats.recovered, 3);
        assert!(dir.path().join(CACHE_FILE_NAME).exists());

        let mut reloaded = TapeDefinition::load(dir.path()).unwrap();
        let (cached, stats) = reloaded.load_block_map(false).unwrap();
        assert!(stats.is_none());
        assert_eq!(cached.keys().collect::<Vec<_>>(), map.keys().collect::<Vec<_>>());
    }

    #[test]
    fn test_definition_changes_invalidate_cache() {
        let dir = tempfile::tempdir().unwrap();
        write_tape(dir.path(), "");
        let mut definition = TapeDefinition::load(dir.path()).unwrap();
        let (map, _) = definition.load_block_map(false).unwrap();
        assert!(map.contains_key(&4));

        let tape = dir.path().join("tape.json");
        let original = std::fs::read_to_string(&tape).unwrap();
        std::fs::write(&tape, original.replace(r#""start": 4"#, r#""start": 100"#)).unwrap();
        let mut definition = TapeDefinition::load(dir.path()).unwrap();
        let (map, stats) = definition.load_block_map(false).unwrap();
        assert!(stats.is_some());
        assert!(!map.contains_key(&4));
        assert!(map.contains_key(&100));

        std::fs::write(&tape, original.replace(r#""type": "adr30""#, r#""type": "adr50""#)).unwrap();
        let mut definition = TapeDefinition::load(dir.path()).unwrap();
        let (_, stats) = definition.load_block_map(false).unwrap();
        assert!(stats.is_some());
    }

    #[test]
    fn test_stale_cache_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        write_tape(dir.path(), "");
        let cache = dir.path().join(CACHE_FILE_NAME);
        std::fs::write(&cache, "# not a cache\n").unwrap();

        let mut definition = TapeDefinition::load(dir.path()).unwrap();
        let (map, stats) = definition.load_block_map(false).unwrap();
        assert_eq!(map.len(), 5);
        assert!(stats.is_some());
        assert_eq!(std::fs::read_to_string(&cache).unwrap(), "# not a cache\n");
    }

    #[test]
    fn test_stream_reconstructs_tape() {
        let dir = tempfile::tempdir().unwrap();
        write_tape(dir.path(), "3");

        let mut definition = TapeDefinition::load(dir.path()).unwrap();
        let (map, _) = definition.load_block_map(false).unwrap();
        let blocks = definition.create_logically_ordered_block_list(&map).unwrap();
        assert_eq!(blocks.len(), 5);
        assert_eq!(blocks[2].missing_run_length, 1);
        assert!(blocks[2].missing_run_is_safe);

        let mut stream = definition.open_stream(blocks);
        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert!(out == payload(&[10, 11, 12, 14, 15]));

        let text = stream.describe_position(3 * DATA_SIZE as u64);
        assert!(text.contains("b.bin byte 0"), "{}", text);
    }

    #[test]
    fn test_condense_writes_new_file_only() {
        let dir = tempfile::tempdir().unwrap();
        write_tape(dir.path(), "");
        let output = dir.path().join("condensed.bin");

        let mut definition = TapeDefinition::load(dir.path()).unwrap();
        let (map, _) = definition.load_block_map(false).unwrap();
        let blocks = definition.create_physically_ordered_block_list(&map).unwrap();
        assert!(blocks[2].has_unsafe_gap());

        let mut stream = definition.open_stream(blocks);
        let written = commands::condense::copy_stream(&mut stream, &output, false).unwrap();
        assert_eq!(written, 5 * DATA_SIZE as u64);
        assert!(std::fs::read(&output).unwrap() == payload(&[10, 11, 12, 14, 15]));

        let err = commands::condense::execute(dir.path().to_path_buf(), output.clone(), false)
            .unwrap_err();
        assert!(matches!(err, TapeError::AlreadyExists(_)));
    }

    #[test]
    fn test_order_export() {
        let dir = tempfile::tempdir().unwrap();
        write_tape(dir.path(), "3");
        let export = dir.path().join("order.json");

        commands::order::execute(dir.path().join("tape.json"), false, Some(export.clone())).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&export).unwrap()).unwrap();
        assert_eq!(json["cartridge"], "adr30");
        assert_eq!(json["order"], "logical");
        assert_eq!(json["summary"]["safe_gaps"], 1);
        assert_eq!(json["blocks"].as_array().unwrap().len(), 5);
        assert_eq!(json["blocks"][3]["file"], "b.bin");
        assert_eq!(json["blocks"][3]["logical_block"], 4);

        let err = commands::order::execute(dir.path().to_path_buf(), false, Some(export)).unwrap_err();
        assert!(matches!(err, TapeError::AlreadyExists(_)));
    }
}
