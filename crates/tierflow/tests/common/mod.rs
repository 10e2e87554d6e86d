use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const ACME_CONFIG: &str = r#"{
  "dev": {
    "systemName": "acme",
    "region": "ap-northeast-1",
    "account": "111111111111",
    "certificateArn": "arn:aws:acm:ap-northeast-1:111111111111:certificate/dev",
    "domainName": "dev.acme.example"
  }
}"#;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    /// ACME の dev 環境だけを持つプロジェクト
    pub fn acme() -> Self {
        let project = Self::new();
        project.write_config(ACME_CONFIG);
        project
    }

    pub fn write_config(&self, content: &str) {
        fs::write(self.root.path().join("tierflow.json"), content).unwrap();
    }

    #[allow(dead_code)]
    pub fn write_file(&self, name: &str, content: &str) {
        fs::write(self.root.path().join(name), content).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }
}
