//! `scrib convert` command implementation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use clap::Args;
use scrib_config::{CliSettings, Config};
use scrib_html::{PruneRules, parse_fragment, prune};
use scrib_renderer::{CollectedImage, MarkdownRenderer, RenderConfig, RenderResult, RuleTable};

use crate::error::CliError;
use crate::output::Output;

/// Separator between documents of a multi-input transcript.
const DOCUMENT_SEPARATOR: &str = "\n\n---\n\n";

/// Arguments for the convert command.
#[derive(Args)]
pub(crate) struct ConvertArgs {
    /// HTML files to convert. Several files are joined into one transcript.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Markdown output file (default: stdout).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for extracted images, relative to the output (overrides config).
    #[arg(long)]
    images_dir: Option<PathBuf>,

    /// Keep data URI images inline instead of extracting them.
    #[arg(long)]
    no_images: bool,

    /// Title heading placed above the converted documents.
    #[arg(long)]
    title: Option<String>,

    /// Path to configuration file (default: auto-discover scrib.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl ConvertArgs {
    /// Execute the convert command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, an input cannot be read or
    /// parsed, or the output cannot be written.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        if let Some(target) = &self.output
            && self.inputs.iter().any(|input| input == target)
        {
            return Err(CliError::Validation(format!(
                "Output {} would overwrite an input file",
                target.display()
            )));
        }

        let cli_settings = CliSettings {
            images_dir: self.images_dir.clone(),
            extract_images: self.no_images.then_some(false),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let renderer = MarkdownRenderer::new(render_config(&config, &output));
        let prune_rules = prune_rules(&config);

        let mut transcript = Transcript::new(renderer.config().images.reference_prefix.clone());
        for input in &self.inputs {
            tracing::info!(path = %input.display(), "Converting");
            let html = std::fs::read_to_string(input)?;
            let tree = parse_fragment(&html).map_err(|source| CliError::Parse {
                path: input.clone(),
                source,
            })?;
            let tree = prune(&tree, &prune_rules);
            transcript.push(renderer.render(&tree));
        }

        let markdown = transcript.markdown(self.title.as_deref());
        let base_dir = match &self.output {
            Some(path) => path.parent().map(Path::to_path_buf).unwrap_or_default(),
            None => PathBuf::new(),
        };
        let images_dir = base_dir.join(&config.output.images_dir);
        write_images(&images_dir, &transcript.images)?;

        match &self.output {
            Some(path) => {
                std::fs::write(path, format!("{markdown}\n"))?;
                output.success(&format!("Wrote {}", path.display()));
            }
            None => print_markdown(&markdown),
        }

        if !transcript.images.is_empty() {
            output.info(&format!(
                "Extracted {} image(s) to {}",
                transcript.images.len(),
                images_dir.display()
            ));
        }
        if transcript.failed_images > 0 {
            output.warning(&format!(
                "{} image(s) failed to extract",
                transcript.failed_images
            ));
        }

        Ok(())
    }
}

#[allow(clippy::print_stdout)]
fn print_markdown(markdown: &str) {
    println!("{markdown}");
}

/// Build the renderer configuration from the loaded config.
///
/// Unknown rule names are reported and skipped.
fn render_config(config: &Config, output: &Output) -> RenderConfig {
    let mut rules = RuleTable::html();
    for (tag, name) in &config.render.rules {
        if let Err(err) = rules.insert_named(tag, name) {
            output.warning(&format!("Ignoring rule for <{tag}>: {err}"));
        }
    }

    let images = &config.images;
    let mut render = RenderConfig::new()
        .with_rules(rules)
        .with_transparent_tags(&config.render.transparent_tags)
        .with_image_extraction(images.extract)
        .with_spinner(
            images.spinner_patterns.iter().map(String::as_str),
            images.spinner_placeholder.as_str(),
        )
        .with_image_prefix(reference_prefix(&config.output.images_dir));
    if let Some(classes) = &config.render.inline_code_classes {
        render = render.with_inline_code_classes(classes.iter().map(String::as_str));
    }
    if let Some(attributes) = &config.render.language_attributes {
        render = render.with_language_attributes(attributes.iter().map(String::as_str));
    }
    render
}

/// Build the pruning rules from the loaded config.
fn prune_rules(config: &Config) -> PruneRules {
    let prune = &config.prune;
    PruneRules::default()
        .with_tags(&prune.tags)
        .with_classes(&prune.classes)
        .with_attributes(&prune.attributes)
}

/// Markdown path prefix for references to files in `images_dir`.
fn reference_prefix(images_dir: &Path) -> String {
    let dir = images_dir.to_string_lossy().replace('\\', "/");
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() || dir == "." {
        String::new()
    } else {
        format!("{dir}/")
    }
}

fn write_images(dir: &Path, images: &[CollectedImage]) -> Result<(), CliError> {
    if images.is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)?;
    for image in images {
        std::fs::write(dir.join(&image.filename), &image.data)?;
    }
    Ok(())
}

/// Converted documents accumulated into one Markdown transcript.
///
/// Each document is rendered independently, so image filenames restart per
/// document. Colliding names are renamed and their references rewritten.
struct Transcript {
    prefix: String,
    documents: Vec<String>,
    images: Vec<CollectedImage>,
    failed_images: usize,
    used: HashSet<String>,
}

impl Transcript {
    fn new(prefix: String) -> Self {
        Self {
            prefix,
            documents: Vec::new(),
            images: Vec::new(),
            failed_images: 0,
            used: HashSet::new(),
        }
    }

    fn push(&mut self, result: RenderResult) {
        let RenderResult {
            mut markdown,
            images,
            failed_images,
            ..
        } = result;

        let reserved: HashSet<String> = images
            .iter()
            .map(|image| image.filename.as_str())
            .chain(failed_images.iter().map(String::as_str))
            .map(str::to_ascii_lowercase)
            .collect();

        for mut image in images {
            image.filename = self.claim(&image.filename, &reserved, &mut markdown);
            self.images.push(image);
        }
        // Failed images keep their references, so their names are claimed too.
        for filename in &failed_images {
            self.claim(filename, &reserved, &mut markdown);
        }
        self.failed_images += failed_images.len();

        if !markdown.is_empty() {
            self.documents.push(markdown);
        }
    }

    /// Reserve `filename` across the transcript, renaming it and rewriting its
    /// reference in `markdown` when an earlier document already uses it.
    fn claim(
        &mut self,
        filename: &str,
        reserved: &HashSet<String>,
        markdown: &mut String,
    ) -> String {
        let mut claimed = filename.to_owned();
        if self.used.contains(&filename.to_ascii_lowercase()) {
            claimed = self.free_name(filename, reserved);
            *markdown = markdown.replace(
                &format!("]({}{filename})", self.prefix),
                &format!("]({}{claimed})", self.prefix),
            );
            tracing::debug!(from = %filename, to = %claimed, "Renamed colliding image");
        }
        self.used.insert(claimed.to_ascii_lowercase());
        claimed
    }

    /// First `<stem>_<n>` name free across the transcript and the current document.
    fn free_name(&self, filename: &str, reserved: &HashSet<String>) -> String {
        let (stem, ext) = match filename.rsplit_once('.') {
            Some((stem, ext)) => (stem, Some(ext)),
            None => (filename, None),
        };
        let mut n = 2;
        loop {
            let candidate = match ext {
                Some(ext) => format!("{stem}_{n}.{ext}"),
                None => format!("{stem}_{n}"),
            };
            let key = candidate.to_ascii_lowercase();
            if !self.used.contains(&key) && !reserved.contains(&key) {
                return candidate;
            }
            n += 1;
        }
    }

    fn markdown(&self, title: Option<&str>) -> String {
        let mut out = String::new();
        if let Some(title) = title.map(str::trim).filter(|title| !title.is_empty()) {
            out.push_str("# ");
            out.push_str(title);
            out.push_str("\n\n");
        }
        out.push_str(&self.documents.join(DOCUMENT_SEPARATOR));
        out.truncate(out.trim_end().len());
        out
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn image(filename: &str) -> CollectedImage {
        CollectedImage {
            filename: filename.to_owned(),
            mime_type: "image/png".to_owned(),
            data: vec![1, 2, 3],
        }
    }

    fn result(markdown: &str, images: Vec<CollectedImage>) -> RenderResult {
        RenderResult {
            markdown: markdown.to_owned(),
            images,
            ..Default::default()
        }
    }

    fn args(inputs: Vec<PathBuf>, output: Option<PathBuf>, config: PathBuf) -> ConvertArgs {
        ConvertArgs {
            inputs,
            output,
            images_dir: None,
            no_images: false,
            title: None,
            config: Some(config),
            verbose: false,
        }
    }

    // 1x1 transparent PNG.
    const PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn test_reference_prefix() {
        assert_eq!(reference_prefix(Path::new("images")), "images/");
        assert_eq!(reference_prefix(Path::new("assets/img/")), "assets/img/");
        assert_eq!(reference_prefix(Path::new(".")), "");
    }

    #[test]
    fn test_transcript_joins_documents() {
        let mut transcript = Transcript::new("images/".to_owned());
        transcript.push(result("First turn", Vec::new()));
        transcript.push(result("", Vec::new()));
        transcript.push(result("Second turn", Vec::new()));

        assert_eq!(
            transcript.markdown(Some("Chat")),
            "# Chat\n\nFirst turn\n\n---\n\nSecond turn"
        );
        assert_eq!(transcript.markdown(None), "First turn\n\n---\n\nSecond turn");
    }

    #[test]
    fn test_transcript_title_only() {
        let transcript = Transcript::new(String::new());
        assert_eq!(transcript.markdown(Some("  Empty  ")), "# Empty");
        assert_eq!(transcript.markdown(Some(" ")), "");
    }

    #[test]
    fn test_transcript_renames_colliding_images() {
        let mut transcript = Transcript::new("images/".to_owned());
        transcript.push(result("![a](images/chart.png)", vec![image("chart.png")]));
        transcript.push(result(
            "![b](images/Chart.png) ![c](images/chart_2.png)",
            vec![image("Chart.png"), image("chart_2.png")],
        ));

        let names: Vec<&str> = transcript
            .images
            .iter()
            .map(|image| image.filename.as_str())
            .collect();
        assert_eq!(names, vec!["chart.png", "Chart_3.png", "chart_2.png"]);
        assert_eq!(
            transcript.markdown(None),
            "![a](images/chart.png)\n\n---\n\n![b](images/Chart_3.png) ![c](images/chart_2.png)"
        );
    }

    #[test]
    fn test_transcript_renames_colliding_failed_images() {
        let mut transcript = Transcript::new("images/".to_owned());
        transcript.push(result("![ok](images/image_1.png)", vec![image("image_1.png")]));
        transcript.push(RenderResult {
            markdown: "![broken](images/image_1.png)".to_owned(),
            failed_images: vec!["image_1.png".to_owned()],
            ..Default::default()
        });
        transcript.push(result("![later](images/image_2.png)", vec![image("image_2.png")]));

        assert_eq!(
            transcript.markdown(None),
            "![ok](images/image_1.png)\n\n---\n\n![broken](images/image_1_2.png)\n\n---\n\n![later](images/image_2.png)"
        );
        let names: Vec<&str> = transcript
            .images
            .iter()
            .map(|image| image.filename.as_str())
            .collect();
        assert_eq!(names, vec!["image_1.png", "image_2.png"]);
        assert_eq!(transcript.failed_images, 1);
    }

    #[test]
    fn test_transcript_counts_failed_images() {
        let mut transcript = Transcript::new(String::new());
        transcript.push(RenderResult {
            markdown: "x".to_owned(),
            failed_images: vec!["image_1.png".to_owned()],
            ..Default::default()
        });
        transcript.push(RenderResult {
            markdown: "y".to_owned(),
            failed_images: vec!["image_1.png".to_owned(), "image_2.png".to_owned()],
            ..Default::default()
        });
        assert_eq!(transcript.failed_images, 3);
    }

    #[test]
    fn test_render_config_from_config() {
        let config: Config = toml::from_str(
            r#"
[render]
transparent_tags = ["Chunk"]
inline_code_classes = ["mono"]

[render.rules]
"x-title" = "h3"
"x-bad" = "marquee"

[images]
spinner_patterns = ["spinner"]
spinner_placeholder = "wait.gif"

[output]
images_dir = "media"
"#,
        )
        .unwrap();

        let render = render_config(&config, &Output::new());

        assert!(render.is_transparent("chunk"));
        assert_eq!(render.inline_code_classes, vec!["mono"]);
        assert_eq!(
            render.rules.get("x-title"),
            Some(scrib_renderer::Rule::Heading(3))
        );
        assert_eq!(render.rules.get("x-bad"), None);
        assert_eq!(render.images.spinner_placeholder, "wait.gif");
        assert_eq!(render.images.reference_prefix, "media/");
        assert_eq!(render.language_attributes, RenderConfig::new().language_attributes);
    }

    #[test]
    fn test_execute_writes_markdown_and_images() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("scrib.toml");
        std::fs::write(&config, "[render]\ntransparent_tags = [\"chunk\"]\n").unwrap();
        let first = dir.path().join("turn1.html");
        std::fs::write(
            &first,
            format!(
                "<h2>Plot</h2><chunk><p>See <b>this</b>:</p></chunk>\
                 <img alt=\"plot\" src=\"data:image/png;base64,{PNG}\"><button>Copy</button>"
            ),
        )
        .unwrap();
        let second = dir.path().join("turn2.html");
        std::fs::write(
            &second,
            format!("<p>Again</p><img alt=\"plot\" src=\"data:image/png;base64,{PNG}\">"),
        )
        .unwrap();
        let out = dir.path().join("out").join("chat.md");
        std::fs::create_dir_all(out.parent().unwrap()).unwrap();

        let mut convert = args(vec![first, second], Some(out.clone()), config);
        convert.title = Some("Session".to_owned());
        convert.execute().unwrap();

        let markdown = std::fs::read_to_string(&out).unwrap();
        assert_eq!(
            markdown,
            "# Session\n\n## Plot\n\nSee **this**:\n\n![plot](images/plot.png)\
             \n\n---\n\nAgain\n\n![plot](images/plot_2.png)\n"
        );
        let images = dir.path().join("out").join("images");
        assert!(images.join("plot.png").is_file());
        assert!(images.join("plot_2.png").is_file());
    }

    #[test]
    fn test_execute_without_extraction_keeps_data_uri() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("scrib.toml");
        std::fs::write(&config, "").unwrap();
        let input = dir.path().join("page.html");
        let src = format!("data:image/png;base64,{PNG}");
        std::fs::write(&input, format!("<img alt=\"x\" src=\"{src}\">")).unwrap();
        let out = dir.path().join("page.md");

        let mut convert = args(vec![input], Some(out.clone()), config);
        convert.no_images = true;
        convert.execute().unwrap();

        assert_eq!(
            std::fs::read_to_string(&out).unwrap(),
            format!("![x]({src})\n")
        );
        assert!(!dir.path().join("images").exists());
    }

    #[test]
    fn test_execute_rejects_overwriting_input() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("scrib.toml");
        std::fs::write(&config, "").unwrap();
        let input = dir.path().join("page.html");
        std::fs::write(&input, "<p>x</p>").unwrap();

        let err = args(vec![input.clone()], Some(input), config)
            .execute()
            .unwrap_err();
        assert!(matches!(err, CliError::Validation(_)));
    }

    #[test]
    fn test_execute_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("scrib.toml");
        std::fs::write(&config, "").unwrap();

        let err = args(
            vec![dir.path().join("missing.html")],
            Some(dir.path().join("out.md")),
            config,
        )
        .execute()
        .unwrap_err();
        assert!(matches!(err, CliError::Io(_)));
    }
}
