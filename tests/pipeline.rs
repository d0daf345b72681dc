//! End-to-end assembly scenarios over real files.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use talon::pipeline::build::{build, BuildReport, Config};

/// A 40-base read whose canonical 5-mers are distinct at every position, so
/// at density 1.0 its minimizer chain is a simple path covering the read.
const LINEAR_READ: &str = "CTCCAGCGCGGTCAGTTCCATCACCCTAAGTAACCGAATA";

/// A 30-base read with the same property, sharing no canonical 5-mer with
/// `LINEAR_READ`.
const OTHER_READ: &str = "TGAGATCGACTCGCCAATATGTTAATGCGG";

fn write_fastq(path: &Path, reads: &[(&str, &str)]) {
    let mut file = fs::File::create(path).unwrap();
    for (name, sequence) in reads {
        writeln!(file, "@{}\n{}\n+\n{}", name, sequence, "I".repeat(sequence.len())).unwrap();
    }
}

fn test_config(dir: &TempDir, input: PathBuf, k: usize) -> Config {
    let mut config = Config::new(input, dir.path().join("unitigs.fasta"), dir.path().join("work"));
    config.k = k;
    config.density = 1.0;
    config.threads = 2;
    config.expected_kmers = 10_000;
    config.sort_buffer_bytes = 1024;
    config
}

/// Parse a FASTA file into (header, unwrapped sequence) pairs.
fn read_fasta(path: &Path) -> Vec<(String, String)> {
    let text = fs::read_to_string(path).unwrap();
    let mut records = Vec::new();
    for line in text.lines() {
        if let Some(header) = line.strip_prefix('>') {
            records.push((header.to_string(), String::new()));
        } else {
            records.last_mut().unwrap().1.push_str(line);
        }
    }
    records
}

fn run(dir: &TempDir, reads: &[(&str, &str)], k: usize) -> (BuildReport, Vec<(String, String)>) {
    let input = dir.path().join("reads.fastq");
    write_fastq(&input, reads);
    let config = test_config(dir, input, k);
    let report = build(&config).unwrap();
    (report, read_fasta(&config.output))
}

#[test]
fn homopolymer_read_collapses_to_one_node() {
    let dir = TempDir::new().unwrap();
    let (report, records) = run(&dir, &[("r0", "AAAAAAAAAAA")], 5);

    assert_eq!(report.minimizers, 1);
    assert_eq!(report.edges, 0);
    assert_eq!(report.unitigs, 0);
    assert!(records.is_empty());
}

#[test]
fn duplicated_read_assembles_back_to_itself() {
    let dir = TempDir::new().unwrap();
    let (report, records) = run(&dir, &[("r0", LINEAR_READ), ("r1", LINEAR_READ)], 5);

    assert_eq!(report.reads, 2);
    assert_eq!(report.minimizers, 36);
    assert_eq!(report.edges, 35);
    assert_eq!(report.unitigs, 1);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].0, format!("unitig_0 length_{}", LINEAR_READ.len()));
    assert_eq!(records[0].1, LINEAR_READ);
}

#[test]
fn gap_read_assembles_each_side_separately() {
    let dir = TempDir::new().unwrap();
    let (left, right) = LINEAR_READ.split_at(20);
    let gapped = format!("{}N{}", left, right);
    let (report, records) = run(&dir, &[("r0", &gapped), ("r1", &gapped)], 5);

    // No k-mer, occurrence, or edge spans the N: each side assembles alone.
    assert_eq!(report.edges, 30);
    assert_eq!(report.unitigs, 2);
    let mut sequences: Vec<&str> = records.iter().map(|(_, s)| s.as_str()).collect();
    sequences.sort();
    let mut expected = vec![left, right];
    expected.sort();
    assert_eq!(sequences, expected);
}

#[test]
fn opposite_strand_reads_share_one_node() {
    let dir = TempDir::new().unwrap();
    let (report, records) = run(&dir, &[("fwd", "AAAAC"), ("rev", "GTTTT")], 5);

    assert_eq!(report.minimizers, 1);
    assert_eq!(report.edges, 0);
    assert_eq!(report.unitigs, 0);
    assert!(records.is_empty());
}

#[test]
fn two_node_ring_comes_from_the_cycle_sweep() {
    // ACGTACGT at k = 4: canonical nodes ACGT and CGTA form a 2-ring with no
    // non-simple vertex, so only the cycle sweep can emit it.
    let dir = TempDir::new().unwrap();
    let (report, records) = run(&dir, &[("r0", "ACGTACGT")], 4);

    assert_eq!(report.minimizers, 2);
    assert_eq!(report.edges, 2);
    assert_eq!(report.unitigs, 1);
    assert_eq!(records[0].1, "ACGTAT");
}

#[test]
fn lowercase_reads_are_tolerated() {
    let dir = TempDir::new().unwrap();
    let lowered = LINEAR_READ.to_ascii_lowercase();
    let (report, records) = run(&dir, &[("r0", &lowered), ("r1", LINEAR_READ)], 5);

    assert_eq!(report.unitigs, 1);
    assert_eq!(records[0].1, LINEAR_READ);
}

#[test]
fn empty_input_produces_an_empty_fasta() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("reads.fastq");
    fs::write(&input, "").unwrap();
    let config = test_config(&dir, input, 5);

    let report = build(&config).unwrap();
    assert_eq!(report.reads, 0);
    assert_eq!(report.unitigs, 0);
    assert_eq!(fs::read_to_string(&config.output).unwrap(), "");
}

#[test]
fn identical_inputs_build_identical_outputs() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let reads = [("r0", LINEAR_READ), ("r1", LINEAR_READ), ("r2", OTHER_READ), ("r3", OTHER_READ)];

    let input_a = dir_a.path().join("reads.fastq");
    write_fastq(&input_a, &reads);
    let config_a = test_config(&dir_a, input_a, 5);
    build(&config_a).unwrap();

    let input_b = dir_b.path().join("reads.fastq");
    write_fastq(&input_b, &reads);
    let config_b = test_config(&dir_b, input_b, 5);
    build(&config_b).unwrap();

    assert_eq!(
        fs::read(&config_a.output).unwrap(),
        fs::read(&config_b.output).unwrap()
    );
}

#[test]
fn read_name_filter_removes_contaminant_reads() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("reads.fastq");
    write_fastq(
        &input,
        &[("keep0", LINEAR_READ), ("drop0", OTHER_READ), ("keep1", LINEAR_READ), ("drop1", OTHER_READ)],
    );
    let names = dir.path().join("mapped_names.txt");
    fs::write(&names, "drop0\ndrop1\n").unwrap();

    let mut config = test_config(&dir, input, 5);
    config.read_name_filter = Some(names);
    let report = build(&config).unwrap();

    assert_eq!(report.unitigs, 1);
    let records = read_fasta(&config.output);
    assert_eq!(records[0].1, LINEAR_READ);
}

#[test]
fn both_read_groups_survive_without_the_filter() {
    let dir = TempDir::new().unwrap();
    let (report, records) = run(
        &dir,
        &[("a0", LINEAR_READ), ("b0", OTHER_READ), ("a1", LINEAR_READ), ("b1", OTHER_READ)],
        5,
    );

    assert_eq!(report.unitigs, 2);
    let mut sequences: Vec<&str> = records.iter().map(|(_, s)| s.as_str()).collect();
    sequences.sort();
    let mut expected = vec![LINEAR_READ, OTHER_READ];
    expected.sort();
    assert_eq!(sequences, expected);
}

#[test]
fn intermediates_are_removed_on_success() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("reads.fastq");
    write_fastq(&input, &[("r0", LINEAR_READ), ("r1", LINEAR_READ)]);
    let names = dir.path().join("names.txt");
    fs::write(&names, "absent\n").unwrap();

    let mut config = test_config(&dir, input, 5);
    config.read_name_filter = Some(names);
    build(&config).unwrap();

    let leftovers: Vec<String> = fs::read_dir(&config.work_dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    assert!(leftovers.is_empty(), "intermediates left behind: {:?}", leftovers);
}

#[test]
fn invalid_parameters_fail_fast() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("reads.fastq");
    write_fastq(&input, &[("r0", LINEAR_READ)]);

    let mut config = test_config(&dir, input.clone(), 0);
    assert!(build(&config).is_err());

    config = test_config(&dir, input.clone(), 32);
    assert!(build(&config).is_err());

    config = test_config(&dir, dir.path().join("missing.fastq"), 5);
    assert!(build(&config).is_err());
}
