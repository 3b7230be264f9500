use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

/// Expected outcome of one fixture program: a final value, an error whose
/// message contains the given text, and optionally the post-run values of
/// named globals.
#[derive(Debug, Deserialize, Clone)]
pub struct ExpectedOutcome {
    #[serde(default)]
    pub result: Option<f64>,
    #[serde(default)]
    pub error_contains: Option<String>,
    #[serde(default)]
    pub variables: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CaseSpec {
    pub expected: ExpectedOutcome,
}

#[derive(Debug, Clone)]
pub struct Case {
    pub name: String,
    pub dir: PathBuf,
    pub program_path: PathBuf,
    pub spec: CaseSpec,
}

impl Case {
    pub fn read_source(&self) -> Result<String> {
        fs::read_to_string(&self.program_path)
            .with_context(|| format!("Reading {}", self.program_path.display()))
    }
}

/// Loads every `tests/programs/<case>/` directory holding a `case.yaml`
/// and a `program.ns`, sorted by case name.
pub fn load_cases(programs_dir: &Path) -> Result<Vec<Case>> {
    let mut cases = Vec::new();

    for entry in
        fs::read_dir(programs_dir).with_context(|| format!("Reading {}", programs_dir.display()))?
    {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }

        let case_path = path.join("case.yaml");
        if !case_path.exists() {
            continue;
        }

        let program_path = path.join("program.ns");
        ensure!(
            program_path.exists(),
            "Missing program.ns for case {}",
            path.display()
        );

        let case_name = path
            .file_name()
            .and_then(|value| value.to_str())
            .map(str::to_string)
            .with_context(|| format!("Invalid case directory name {}", path.display()))?;
        let case_raw = fs::read_to_string(&case_path)
            .with_context(|| format!("Reading {}", case_path.display()))?;
        let spec: CaseSpec = serde_yaml::from_str(&case_raw)
            .with_context(|| format!("Parsing {}", case_path.display()))?;

        ensure!(
            spec.expected.result.is_some() || spec.expected.error_contains.is_some(),
            "Case {} expects neither a result nor an error",
            case_name
        );

        cases.push(Case {
            name: case_name,
            dir: path,
            program_path,
            spec,
        });
    }

    ensure!(
        !cases.is_empty(),
        "No test cases found in {}",
        programs_dir.display()
    );
    cases.sort_by(|left, right| left.name.cmp(&right.name));
    Ok(cases)
}
