use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::prelude::{eprintln, println, *};
use fragenimport_core::{
    BoundingBox, Dataset, DatasetMeta, ImportOutcome, Line, PlacedImage, ReconcileStats,
    RepairFlag,
};

#[derive(Debug, clap::Args)]
pub struct ImportOptions {
    /// Path to the question catalog PDF
    pub source: PathBuf,

    /// Directory the dataset and image files are written to
    #[clap(long, default_value = "data")]
    pub output: PathBuf,

    /// Dataset file name inside the output directory
    #[clap(long, default_value = "questions.json")]
    pub dataset: String,

    /// Image directory name inside the output directory
    #[clap(long, default_value = "images")]
    pub images_dir: String,
}

pub fn run(options: ImportOptions, global: crate::Global) -> Result<()> {
    // A missing source is the one fatal precondition; everything downstream
    // degrades per question instead of aborting.
    if !options.source.is_file() {
        return Err(eyre!(Error::SourceNotFound(
            options.source.display().to_string()
        )));
    }

    let bytes = fs::read(&options.source)
        .with_context(|| f!("cannot read {}", options.source.display()))?;

    let extracted = pdf::ExtractedDocument::from_bytes(&bytes)
        .with_context(|| f!("cannot parse {}", options.source.display()))?;

    let lines = convert_lines(&extracted.lines);
    let images_by_page = convert_images(&extracted.images_by_page);

    let dataset_path = options.output.join(&options.dataset);
    let prior = load_prior_dataset(&dataset_path);

    let ImportOutcome {
        mut questions,
        repairs,
        reconcile,
    } = fragenimport_core::import_document(&lines, &images_by_page, prior.as_ref());

    // Persist claimed images and rewrite each question's image list to
    // dataset-relative paths.
    let images_path = options.output.join(&options.images_dir);
    fs::create_dir_all(&images_path)
        .with_context(|| f!("cannot create {}", images_path.display()))?;

    let mut images_written = 0usize;
    for question in &mut questions {
        for (idx, image) in question.claimed_images.iter().enumerate() {
            let filename = f!(
                "question_{:04}_{}.{}",
                question.id,
                idx + 1,
                image.extension
            );
            fs::write(images_path.join(&filename), &image.bytes)
                .with_context(|| f!("cannot write image {}", filename))?;
            question
                .images
                .push(f!("{}/{}", options.images_dir, filename));
            images_written += 1;
        }
    }

    let source_name = options
        .source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| options.source.display().to_string());

    let dataset = Dataset {
        meta: DatasetMeta {
            source: source_name,
            generated_at: chrono::Utc::now().to_rfc3339(),
            question_count: questions.len(),
        },
        questions,
    };

    fs::create_dir_all(&options.output)
        .with_context(|| f!("cannot create {}", options.output.display()))?;
    let json = serde_json::to_string_pretty(&dataset)?;
    fs::write(&dataset_path, json)
        .with_context(|| f!("cannot write {}", dataset_path.display()))?;

    print_summary(&dataset, extracted.page_count, images_written, &reconcile);
    report_repairs(&repairs, global.verbose);

    Ok(())
}

/// Convert the reader's positioned lines into the core representation.
fn convert_lines(lines: &[pdf::Line]) -> Vec<Line> {
    lines
        .iter()
        .map(|l| {
            Line::new(
                &l.text,
                BoundingBox::new(l.bbox.left, l.bbox.top, l.bbox.right, l.bbox.bottom),
                l.page,
            )
        })
        .collect()
}

fn convert_images(
    images_by_page: &BTreeMap<u32, Vec<pdf::PlacedImage>>,
) -> BTreeMap<u32, Vec<PlacedImage>> {
    images_by_page
        .iter()
        .map(|(&page, images)| {
            let converted = images
                .iter()
                .map(|i| PlacedImage {
                    page: i.page,
                    bbox: BoundingBox::new(i.bbox.left, i.bbox.top, i.bbox.right, i.bbox.bottom),
                    bytes: i.bytes.clone(),
                    extension: i.extension.clone(),
                })
                .collect();
            (page, converted)
        })
        .collect()
}

/// Best-effort load of the previously persisted dataset.  A missing or
/// unreadable file just means there is nothing to reconcile against.
fn load_prior_dataset(path: &Path) -> Option<Dataset> {
    let contents = fs::read_to_string(path).ok()?;
    match serde_json::from_str::<Dataset>(&contents) {
        Ok(dataset) => Some(dataset),
        Err(e) => {
            eprintln!(
                "warning: ignoring existing dataset {} ({})",
                path.display(),
                e
            );
            None
        }
    }
}

fn print_summary(
    dataset: &Dataset,
    page_count: usize,
    images_written: usize,
    reconcile: &ReconcileStats,
) {
    let mut table = new_table();
    table.add_row(prettytable::row!["Pages", page_count]);
    table.add_row(prettytable::row!["Questions", dataset.questions.len()]);
    table.add_row(prettytable::row!["Images written", images_written]);
    table.add_row(prettytable::row!["Answer keys carried", reconcile.carried]);
    table.add_row(prettytable::row![
        "Stale answer keys dropped",
        reconcile.out_of_range
    ]);
    table.printstd();
}

fn report_repairs(repairs: &[RepairFlag], verbose: bool) {
    for flag in repairs {
        if !flag.also_applicable.is_empty() {
            eprintln!(
                "warning: {} repaired with `{}` but {:?} also matched -- review the answers",
                flag.display_number, flag.applied, flag.also_applicable
            );
        } else if verbose {
            println!("{}: answers repaired with `{}`", flag.display_number, flag.applied);
        }
    }
}
