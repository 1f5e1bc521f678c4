use std::path::{Path, PathBuf};

use serde::Deserialize;

use newsdoc::content::BlockType;
use newsdoc::{AtomicKind, GeneratorOptions, from_html, to_html};

/// One expected block in the parsed document.
#[derive(Debug, Deserialize)]
pub struct ExpectedBlock {
    /// Block kind label: unstyled, h1..h6, blockquote, ul, ol, atomic.
    pub kind: String,

    /// Expected block text.
    #[serde(default)]
    pub text: String,

    /// Expected list nesting depth.
    #[serde(default)]
    pub depth: usize,
}

#[derive(Debug, Deserialize)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Atomic kinds disabled during generation ("table", "media", "embed").
    #[serde(default)]
    pub disable: Vec<String>,

    /// Expected generator output for the parsed document (trimmed comparison).
    #[serde(default)]
    pub expect_html: Option<String>,

    /// Expected parsed block structure.
    #[serde(default)]
    pub expect_blocks: Option<Vec<ExpectedBlock>>,

    /// If true, the test expects parsing to fail.
    #[serde(default)]
    pub expect_parse_error: bool,
}

fn block_kind_label(block_type: BlockType) -> String {
    match block_type {
        BlockType::Unstyled => "unstyled".to_string(),
        BlockType::Header(level) => format!("h{}", level),
        BlockType::Blockquote => "blockquote".to_string(),
        BlockType::UnorderedListItem => "ul".to_string(),
        BlockType::OrderedListItem => "ol".to_string(),
        BlockType::Atomic => "atomic".to_string(),
    }
}

/// Split a `.test.html` file into its TOML frontmatter and HTML source.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}'); // strip BOM

    let rest = content
        .strip_prefix("---")
        .ok_or("missing opening --- frontmatter delimiter")?;
    let rest = strip_newline(rest);

    let (frontmatter, body) = rest
        .split_once("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let config: TestConfig = toml::from_str(frontmatter.trim_end_matches('\r'))
        .map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, strip_newline(body)))
}

fn strip_newline(s: &str) -> &str {
    s.strip_prefix("\r\n")
        .or_else(|| s.strip_prefix('\n'))
        .unwrap_or(s)
}

struct Failure {
    path: PathBuf,
    reason: String,
}

/// Run one fixture. `Ok(label)` on pass, `Err(reason)` on failure.
fn run_single_test(path: &Path) -> Result<String, String> {
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("cannot read file: {}", e))?;
    let (config, source) =
        parse_test_file(&content).map_err(|e| format!("frontmatter error: {}", e))?;

    let label = config
        .description
        .clone()
        .unwrap_or_else(|| path.display().to_string());

    let parse_result = from_html(source);

    if config.expect_parse_error {
        return match parse_result {
            Err(_) => Ok(label),
            Ok(_) => Err("expected parse error, but parsing succeeded".into()),
        };
    }

    let state = parse_result.map_err(|e| format!("unexpected parse error: {}", e))?;

    if let Some(expected) = &config.expect_blocks {
        check_blocks(&state.blocks, expected)?;
    }

    if let Some(expected_html) = &config.expect_html {
        let options = generator_options(&config.disable)?;
        let actual = to_html(&state, &options);
        if actual.trim() != expected_html.trim() {
            return Err(format!(
                "html mismatch\n  expected: {}\n  actual:   {}",
                expected_html.trim(),
                actual.trim()
            ));
        }
    }

    Ok(label)
}

fn check_blocks(
    blocks: &[newsdoc::ContentBlock],
    expected: &[ExpectedBlock],
) -> Result<(), String> {
    if blocks.len() != expected.len() {
        let actual: Vec<String> = blocks
            .iter()
            .map(|b| format!("  - {} \"{}\"", block_kind_label(b.block_type), b.text))
            .collect();
        return Err(format!(
            "expected {} block(s), got {}\n  actual blocks:\n{}",
            expected.len(),
            blocks.len(),
            actual.join("\n")
        ));
    }
    for (i, (block, want)) in blocks.iter().zip(expected.iter()).enumerate() {
        let kind = block_kind_label(block.block_type);
        if kind != want.kind {
            return Err(format!(
                "block[{}]: expected kind {}, got {}",
                i, want.kind, kind
            ));
        }
        if block.block_type != BlockType::Atomic && block.text != want.text {
            return Err(format!(
                "block[{}]: expected text \"{}\", got \"{}\"",
                i, want.text, block.text
            ));
        }
        if block.depth != want.depth {
            return Err(format!(
                "block[{}]: expected depth {}, got {}",
                i, want.depth, block.depth
            ));
        }
    }
    Ok(())
}

pub fn generator_options(disable: &[String]) -> Result<GeneratorOptions, String> {
    let mut options = GeneratorOptions::default();
    for name in disable {
        let kind: AtomicKind = name.parse()?;
        options.disabled.insert(kind);
    }
    Ok(options)
}

/// All `.test.html` files under `path`, sorted; a single file is its own
/// suite.
fn discover(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }
    let mut files = Vec::new();
    collect(path, &mut files);
    files.sort();
    files
}

fn collect(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(&path, out);
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".test.html"))
        {
            out.push(path);
        }
    }
}

fn paint(text: &str, code: &str, no_color: bool) -> String {
    if no_color {
        text.to_string()
    } else {
        format!("{}{}\x1b[0m", code, text)
    }
}

/// Run every fixture under `path`. Returns exit code: 0 = all pass, 1 = any
/// failure (or nothing to run).
pub fn run_tests(path: &Path, no_color: bool) -> i32 {
    let files = discover(path);
    if files.is_empty() {
        eprintln!("no .test.html files found in {}", path.display());
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<Failure> = Vec::new();

    for file in &files {
        match run_single_test(file) {
            Ok(label) => {
                passed += 1;
                eprintln!("  {}  {}", paint("PASS", "\x1b[32m", no_color), label);
            }
            Err(reason) => {
                eprintln!(
                    "  {}  {}",
                    paint("FAIL", "\x1b[31m", no_color),
                    file.display()
                );
                failures.push(Failure {
                    path: file.clone(),
                    reason,
                });
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for failure in &failures {
            eprintln!();
            eprintln!("  --- {} ---", failure.path.display());
            for line in failure.reason.lines() {
                eprintln!("  {}", line);
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!(
            "test result: {}. {} passed, 0 failed",
            paint("ok", "\x1b[32m", no_color),
            passed
        );
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            paint("FAILED", "\x1b[31m", no_color),
            passed,
            failures.len(),
            files.len()
        );
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn frontmatter_splits_config_and_source() {
        let content = "---\ndescription = \"basic\"\n---\n<p>hi</p>\n";
        let (config, source) = parse_test_file(content).unwrap();
        assert_eq!(config.description.as_deref(), Some("basic"));
        assert_eq!(source, "<p>hi</p>\n");
    }

    #[test]
    fn missing_frontmatter_is_an_error() {
        assert!(parse_test_file("<p>hi</p>").is_err());
    }

    #[test]
    fn passing_fixture_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(
            dir.path(),
            "basic.test.html",
            "---\nexpect_html = \"<p>hi</p>\"\n\n[[expect_blocks]]\nkind = \"unstyled\"\ntext = \"hi\"\n---\n<p>hi</p>\n",
        );
        assert!(run_single_test(&path).is_ok());
    }

    #[test]
    fn html_mismatch_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(
            dir.path(),
            "bad.test.html",
            "---\nexpect_html = \"<p>nope</p>\"\n---\n<p>hi</p>\n",
        );
        let reason = run_single_test(&path).unwrap_err();
        assert!(reason.contains("html mismatch"));
    }

    #[test]
    fn unknown_disable_kind_fails() {
        assert!(generator_options(&["tables".to_string()]).is_err());
        assert!(generator_options(&["table".to_string()]).is_ok());
        assert!(generator_options(&["embed".to_string()]).is_ok());
    }

    #[test]
    fn discovery_recurses_into_subfolders() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("lists")).unwrap();
        write_fixture(dir.path(), "a.test.html", "---\n---\n<p>a</p>");
        write_fixture(
            &dir.path().join("lists"),
            "b.test.html",
            "---\n---\n<ul><li>b</li></ul>",
        );
        write_fixture(dir.path(), "notes.txt", "not a fixture");
        let files = discover(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.ends_with("a.test.html") || f.ends_with("lists/b.test.html")));
    }
}
