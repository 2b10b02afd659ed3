//! Common test utilities

#![allow(dead_code)]

use sprocket::config::{parse_config, Config};
use sprocket::runner::{Context, Verbosity};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A throwaway front-end project on disk
pub struct Project {
    dir: TempDir,
}

impl Project {
    /// Empty project using the default layout
    pub fn new() -> Self {
        Project {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Project with a sprocket.yml
    pub fn with_config(yaml: &str) -> Self {
        let project = Project::new();
        project.write("sprocket.yml", yaml);
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file, creating parent directories
    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.root().join(relative)).unwrap()
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.root().join(relative).exists()
    }

    /// Relative paths of every file below `relative`, sorted
    pub fn list(&self, relative: &str) -> Vec<String> {
        let base = self.root().join(relative);
        let mut found = Vec::new();
        collect(&base, &base, &mut found);
        found.sort();
        found
    }

    pub fn config(&self) -> Config {
        let path = self.root().join("sprocket.yml");
        if path.is_file() {
            parse_config(&fs::read_to_string(path).unwrap()).unwrap()
        } else {
            Config::default()
        }
    }

    /// Silent context rooted at the project
    pub fn context(&self) -> Context {
        Context::new(self.config())
            .with_root(self.root())
            .with_verbosity(Verbosity::Silent)
    }
}

fn collect(base: &Path, dir: &Path, found: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect(base, &path, found);
        } else {
            let relative = path.strip_prefix(base).unwrap();
            found.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }
}

/// A small site touching every transform
pub fn site() -> Project {
    let project = Project::new();
    project.write(
        "src/index.html",
        r#"<!doctype html>
<html>
<head>
  <link rel="stylesheet" href="css/main.css">
</head>
<body>
  <!--@@include('partials/header.html')-->
  <script src="js/main.js"></script>
</body>
</html>
"#,
    );
    project.write("src/partials/header.html", "<header>Welcome</header>\n");
    project.write(
        "src/style/main.scss",
        "@import 'utils/vars';\nbody { color: $text; }\n@media (max-width: 600px) { body { margin: 0; } }\n",
    );
    project.write("src/style/utils/_vars.scss", "$text: #333;\n");
    project.write("src/js/a.js", "var greeting = 'hello';\n");
    project.write("src/js/b.js", "console.log(greeting);\n");
    project.write("src/fonts/sans/regular.woff2", "font-bytes");
    project
}
