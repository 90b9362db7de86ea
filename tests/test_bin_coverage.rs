use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("failed to create temp config");
    file.write_all(contents.as_bytes())
        .expect("failed to write temp config");
    file
}

#[allow(dead_code)]
mod vnifgsm_attack_bin {
    include!("../vnifgsm_attack.rs");

    #[cfg(test)]
    mod coverage_tests {
        use super::*;

        fn cli(args: &[&str]) -> Cli {
            let mut argv = vec!["vnifgsm_attack"];
            argv.extend_from_slice(args);
            Cli::try_parse_from(argv).expect("arguments should parse")
        }

        fn linear_cli(extra: &[&str]) -> Cli {
            let mut args = vec![
                "--architecture",
                "config/architectures/linear_3x4x4.json",
                "--batch",
                "config/batches/gray_2x3x4x4.json",
            ];
            args.extend_from_slice(extra);
            cli(&args)
        }

        #[test]
        fn test_cli_requires_architecture_and_batch() {
            assert!(Cli::try_parse_from(["vnifgsm_attack"]).is_err());
            assert!(Cli::try_parse_from(["vnifgsm_attack", "--batch", "b.json"]).is_err());
        }

        #[test]
        fn test_attack_config_defaults_without_file() {
            let config = attack_config(&linear_cli(&[])).unwrap();
            assert_eq!(config, AttackConfig::default());
        }

        #[test]
        fn test_attack_config_overrides() {
            let config = attack_config(&linear_cli(&[
                "--config",
                "config/vnifgsm_default.json",
                "--seed",
                "9",
                "--steps",
                "3",
                "--eps",
                "0.1",
                "--targeted",
                "--parallel",
            ]))
            .unwrap();

            assert_eq!(config.seed, Some(9));
            assert_eq!(config.steps, 3);
            assert_eq!(config.eps, 0.1);
            assert!(config.targeted);
            assert!(config.parallel);
            assert_eq!(config.n, 5);
        }

        #[test]
        fn test_attack_config_keeps_file_flags() {
            let config =
                attack_config(&linear_cli(&["--config", "config/vnifgsm_targeted.json"])).unwrap();
            assert!(config.targeted);
            assert!(config.parallel);
            assert_eq!(config.seed, Some(2024));
        }

        #[test]
        fn test_attack_config_rejects_negative_eps_override() {
            let result = attack_config(&linear_cli(&["--eps=-0.5"]));
            assert!(result.is_err());
        }

        #[test]
        fn test_load_batch_from_disk() {
            let (batch, labels) =
                load_batch(Path::new("config/batches/gray_2x3x4x4.json")).unwrap();
            assert_eq!(batch.shape(), &[2, 3, 4, 4]);
            assert!(batch.iter().all(|&v| v == 0.5));
            assert_eq!(labels, vec![0, 1]);
        }

        #[test]
        fn test_load_batch_rejects_short_payload() {
            let temp = crate::write_temp_config(
                r#"{ "shape": [1, 1, 2, 2], "pixels": [0.1, 0.2, 0.3], "labels": [0] }"#,
            );
            let err = load_batch(temp.path()).unwrap_err();
            assert!(err.to_string().contains("needs 4"));
        }

        #[test]
        fn test_load_batch_rejects_label_count() {
            let temp = crate::write_temp_config(
                r#"{ "shape": [2, 1, 1, 1], "pixels": [0.1, 0.2], "labels": [0] }"#,
            );
            let err = load_batch(temp.path()).unwrap_err();
            assert!(err.to_string().contains("2 samples but 1 labels"));
        }

        #[test]
        fn test_load_batch_rejects_empty_shape() {
            let disk = DiskBatch {
                shape: [0, 3, 4, 4],
                pixels: vec![],
                labels: vec![],
            };
            assert!(disk.into_parts().is_err());
        }

        #[test]
        fn test_load_batch_rejects_overflowing_shape() {
            let disk = DiskBatch {
                shape: [usize::MAX, 2, 1, 1],
                pixels: vec![0.5],
                labels: vec![0],
            };
            let err = disk.into_parts().unwrap_err();
            let io_err = err.downcast_ref::<io::Error>().expect("expected an io::Error");
            assert_eq!(io_err.kind(), ErrorKind::InvalidData);
            assert!(err.to_string().contains("overflows"));
        }

        #[test]
        fn test_load_batch_overflowing_shape_from_json() {
            let temp = crate::write_temp_config(
                r#"{ "shape": [18446744073709551615, 4, 4, 4], "pixels": [0.5], "labels": [0] }"#,
            );
            let err = load_batch(temp.path()).unwrap_err();
            assert!(err.to_string().contains("overflows"));
        }

        #[test]
        fn test_load_batch_missing_file() {
            assert!(load_batch(Path::new("config/batches/missing.json")).is_err());
        }

        #[test]
        fn test_run_linear_model() {
            let report = run(&linear_cli(&["--seed", "1", "--steps", "2"])).unwrap();

            assert_eq!(report.total, 2);
            assert!(!report.targeted);
            assert!(report.max_perturbation > 0.0);
            assert!(report.max_perturbation <= 8.0 / 255.0 + 1e-6);
        }

        #[test]
        fn test_run_cnn_with_normalization_and_targeted_config() {
            let report = run(&cli(&[
                "--architecture",
                "config/architectures/cnn_3x4x4.json",
                "--batch",
                "config/batches/gray_2x3x4x4.json",
                "--config",
                "config/vnifgsm_targeted.json",
                "--steps",
                "3",
                "--imagenet-normalize",
                "--model-seed",
                "5",
            ]))
            .unwrap();

            assert_eq!(report.total, 2);
            assert!(report.targeted);
            assert!(report.max_perturbation <= 0.0627451 + 1e-6);
        }

        #[test]
        fn test_run_reports_label_errors() {
            let temp = crate::write_temp_config(
                r#"{ "shape": [1, 3, 4, 4], "pixels": [
                    0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5,
                    0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5,
                    0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5
                ], "labels": [42] }"#,
            );
            let result = run(&cli(&[
                "--architecture",
                "config/architectures/linear_3x4x4.json",
                "--batch",
                temp.path().to_str().unwrap(),
            ]));
            assert!(result.unwrap_err().to_string().contains("label 42"));
        }

        #[test]
        fn test_print_report_both_formats() {
            let report = run(&linear_cli(&["--seed", "3", "--steps", "1"])).unwrap();
            print_report(&report, false);
            print_report(&report, true);
        }
    }
}
