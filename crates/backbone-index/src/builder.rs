use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;
use tantivy::{Index, IndexWriter, TantivyDocument};
use tracing::{debug, info, warn};
use zip::ZipArchive;

use backbone_types::{ClassificationEntry, NameParser, Rank, TaxonUsage, TaxonomicStatus};

use crate::error::IndexError;
use crate::normalize::normalize;
use crate::schema::build_schema;

const CHECKLIST_ENTRY: &str = "NameUsage.tsv";
const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Counters reported after a completed build.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuildStats {
    /// Rows read from the checklist.
    pub rows: usize,
    /// Documents written to the index.
    pub indexed: usize,
    /// Rows dropped because their id was already taken.
    pub duplicates: usize,
}

/// One row of the `NameUsage.tsv` checklist export.
#[derive(Clone, Debug, Deserialize)]
struct UsageRow {
    #[serde(rename = "col:ID")]
    id: Option<String>,
    #[serde(rename = "col:parentID")]
    parent_id: Option<String>,
    #[serde(rename = "col:status")]
    status: Option<String>,
    #[serde(rename = "col:rank")]
    rank: Option<String>,
    #[serde(rename = "col:scientificName")]
    scientific_name: Option<String>,
    #[serde(rename = "col:authorship")]
    authorship: Option<String>,
    #[serde(rename = "col:specificEpithet")]
    specific_epithet: Option<String>,
    #[serde(rename = "col:genericName")]
    generic_name: Option<String>,
    #[serde(rename = "col:code")]
    code: Option<String>,
    #[serde(rename = "col:nameStatus")]
    name_status: Option<String>,
    #[serde(rename = "col:extinct")]
    extinct: Option<String>,
}

impl UsageRow {
    fn parsed_rank(&self) -> Rank {
        match self.rank.as_deref() {
            None => {
                warn!(name = ?self.scientific_name, "rank missing, defaulting to unranked");
                Rank::Unranked
            }
            Some(raw) => Rank::parse(raw).unwrap_or_else(|| {
                warn!(rank = raw, "unknown rank, defaulting to unranked");
                Rank::Unranked
            }),
        }
    }

    fn parsed_status(&self) -> TaxonomicStatus {
        self.status
            .as_deref()
            .map(TaxonomicStatus::parse)
            .unwrap_or_default()
    }

    fn parsed_extinct(&self) -> bool {
        match self.extinct.as_deref() {
            None => false,
            Some(v) => v == "1" || v.eq_ignore_ascii_case("true"),
        }
    }
}

/// Build a fresh index from the zipped checklist at `archive` into
/// `index_dir`, wiping whatever was there before.
///
/// The checklist is read twice: a first pass caches every row by id so the
/// second pass can resolve each usage's parent chain without assuming any
/// row order. A parent id that resolves to no row ends the chain, which
/// makes such usages roots.
pub fn build_index(
    archive: &Path,
    index_dir: &Path,
    parser: &dyn NameParser,
) -> Result<BuildStats, IndexError> {
    let mut stats = BuildStats::default();

    info!(archive = %archive.display(), "filling checklist cache");
    let cache = populate_cache(archive, &mut stats)?;

    if index_dir.exists() {
        std::fs::remove_dir_all(index_dir)?;
    }
    std::fs::create_dir_all(index_dir)?;
    let (schema, fields) = build_schema();
    let index = Index::create_in_dir(index_dir, schema)?;
    let mut writer: IndexWriter = index.writer(WRITER_HEAP_BYTES)?;

    info!(index_dir = %index_dir.display(), "indexing name usages");
    let mut indexed_ids: HashSet<String> = HashSet::with_capacity(cache.len());
    each_row(archive, |row| {
        let Some(id) = row.id.clone() else {
            warn!("skipping checklist row without id");
            return Ok(());
        };
        if !indexed_ids.insert(id.clone()) {
            // duplicate id, the first occurrence already won
            return Ok(());
        }
        let Some(scientific_name) = row.scientific_name.clone() else {
            warn!(id, "skipping checklist row without scientific name");
            return Ok(());
        };

        let ancestors = resolve_ancestors(&row, &cache);
        let usage = to_usage(&row, id, scientific_name, &ancestors, parser);

        let mut doc = TantivyDocument::new();
        doc.add_text(fields.id, &usage.id);
        doc.add_text(fields.canonical, normalize(&usage.canonical_name));
        doc.add_text(fields.usage, serde_json::to_string(&usage)?);
        writer.add_document(doc)?;
        stats.indexed += 1;
        if stats.indexed % 10_000 == 0 {
            debug!(indexed = stats.indexed, "indexing progress");
        }
        Ok(())
    })?;

    writer.commit()?;
    info!(
        rows = stats.rows,
        indexed = stats.indexed,
        duplicates = stats.duplicates,
        "finished indexing"
    );
    Ok(stats)
}

fn populate_cache(
    archive: &Path,
    stats: &mut BuildStats,
) -> Result<HashMap<String, UsageRow>, IndexError> {
    let mut cache = HashMap::new();
    each_row(archive, |row| {
        stats.rows += 1;
        if stats.rows % 10_000 == 0 {
            info!(rows = stats.rows, "cache fill progress");
        }
        let Some(id) = row.id.clone() else {
            return Ok(());
        };
        if cache.contains_key(&id) {
            warn!(id, "duplicate usage id, keeping first occurrence");
            stats.duplicates += 1;
        } else {
            cache.insert(id, row);
        }
        Ok(())
    })?;
    info!(usages = cache.len(), "checklist cache filled");
    Ok(cache)
}

fn each_row(
    archive: &Path,
    mut f: impl FnMut(UsageRow) -> Result<(), IndexError>,
) -> Result<(), IndexError> {
    let file = File::open(archive)?;
    let mut zip = ZipArchive::new(file).map_err(|source| IndexError::Archive {
        path: archive.to_path_buf(),
        source,
    })?;
    let entry = zip
        .by_name(CHECKLIST_ENTRY)
        .map_err(|_| IndexError::MissingEntry(CHECKLIST_ENTRY))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(BufReader::new(entry));
    for row in reader.deserialize() {
        f(row?)?;
    }
    Ok(())
}

/// Walk the parent chain. Cycles cannot occur in a sane checklist, but a
/// guard keeps a broken one from hanging the build.
fn resolve_ancestors<'a>(
    row: &UsageRow,
    cache: &'a HashMap<String, UsageRow>,
) -> Vec<&'a UsageRow> {
    let mut ancestors = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut parent_id = row.parent_id.as_deref();
    while let Some(pid) = parent_id {
        if !seen.insert(pid) {
            warn!(id = ?row.id, "cycle in parent chain, treating as root");
            break;
        }
        match cache.get(pid) {
            Some(parent) => {
                ancestors.push(parent);
                parent_id = parent.parent_id.as_deref();
            }
            None => break,
        }
    }
    ancestors
}

fn to_usage(
    row: &UsageRow,
    id: String,
    scientific_name: String,
    ancestors: &[&UsageRow],
    parser: &dyn NameParser,
) -> TaxonUsage {
    let rank = row.parsed_rank();
    let canonical_name = parser
        .parse_to_canonical(&scientific_name, Some(rank))
        .unwrap_or_else(|| scientific_name.clone());

    let mut usage = TaxonUsage {
        id,
        parent_id: row.parent_id.clone(),
        scientific_name,
        canonical_name,
        authorship: row.authorship.clone(),
        rank: Some(rank),
        status: row.parsed_status(),
        specific_epithet: row.specific_epithet.clone(),
        generic_name: row.generic_name.clone(),
        code: row.code.clone(),
        name_status: row.name_status.clone(),
        extinct: row.parsed_extinct(),
        ..TaxonUsage::default()
    };

    for ancestor in ancestors {
        let (Some(aid), Some(name)) = (&ancestor.id, &ancestor.scientific_name) else {
            continue;
        };
        usage.classification.push(ClassificationEntry {
            id: aid.clone(),
            scientific_name: name.clone(),
            authorship: ancestor.authorship.clone(),
            rank: ancestor.rank.clone().unwrap_or_default(),
            status: ancestor.parsed_status(),
            extinct: ancestor.parsed_extinct(),
        });
        match ancestor.rank.as_deref().and_then(Rank::parse) {
            Some(Rank::Kingdom) => usage.kingdom = Some(name.clone()),
            Some(Rank::Phylum) => usage.phylum = Some(name.clone()),
            Some(Rank::Class) => usage.class = Some(name.clone()),
            Some(Rank::Order) => usage.order = Some(name.clone()),
            Some(Rank::Family) => usage.family = Some(name.clone()),
            Some(Rank::Genus) => usage.genus = Some(name.clone()),
            Some(Rank::Subgenus) => usage.subgenus = Some(name.clone()),
            Some(Rank::Species) => usage.species = Some(name.clone()),
            Some(other) => debug!(rank = %other, "no shortcut field for rank"),
            None => warn!(name = name.as_str(), "ancestor without a known rank"),
        }
    }

    usage
}
