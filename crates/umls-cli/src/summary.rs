use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use umls_model::{Candidate, MentionKeys};

use crate::types::{GroundOutcome, ResolveOutcome, ResolvedMention};

pub fn print_ground_summary(outcome: &GroundOutcome) {
    println!("Documents: {}", outcome.documents_path.display());
    println!("Reference: {}", outcome.reference_path.display());
    match &outcome.artifacts {
        Some(paths) => {
            println!("Output: {}", outcome.output_dir.display());
            for path in paths.iter() {
                println!("  {}", path.display());
            }
        }
        None => println!("Output: (dry run, nothing written)"),
    }

    let batch = &outcome.batch;
    let scan = &batch.index.scan;
    let mut table = Table::new();
    table.set_header(vec![header_cell("Metric"), header_cell("Count")]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    let rows: [(&str, Cell); 11] = [
        ("Documents", Cell::new(outcome.enrichment.documents)),
        ("Entities", Cell::new(outcome.enrichment.entities)),
        ("Unique mentions", Cell::new(batch.mentions)),
        ("Mapped", count_cell(batch.mapped, Color::Green)),
        ("Excluded (measurement)", count_cell(batch.excluded, Color::Yellow)),
        ("Unmapped", count_cell(batch.unmapped, Color::Red)),
        ("Lookup keys", Cell::new(batch.keys)),
        ("Rows scanned", Cell::new(scan.lines)),
        ("Rows kept", Cell::new(batch.index.candidates)),
        ("Triples", Cell::new(outcome.enrichment.triples)),
        (
            "Dropped relations",
            count_cell(outcome.enrichment.dropped_relations, Color::Yellow),
        ),
    ];
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), value]);
    }
    table.add_row(vec![
        Cell::new("Mapped entities")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(format!(
            "{} / {}",
            outcome.enrichment.grounded_entities, outcome.enrichment.entities
        ))
        .add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
    println!(
        "Scan: {} shard(s), {} malformed, {} non-English, {:.2}s",
        batch.index.shards,
        scan.malformed,
        scan.non_english,
        outcome.elapsed.as_secs_f64()
    );
}

pub fn print_resolve(outcome: &ResolveOutcome) {
    for mention in &outcome.mentions {
        print_resolved_mention(mention);
    }
    println!(
        "{} mapped, {} excluded, {} unmapped ({} rows scanned)",
        outcome.batch.mapped,
        outcome.batch.excluded,
        outcome.batch.unmapped,
        outcome.batch.index.scan.lines
    );
}

fn print_resolved_mention(mention: &ResolvedMention) {
    let (Some(keys), Some(result)) = (&mention.keys, &mention.result) else {
        println!("{}: not grounded", mention.text);
        return;
    };
    let label = format!("{} [{}]", mention.text, keys.canonical);
    match result.excluded_reason {
        Some(reason) => println!("{label} -> excluded ({})", reason.as_str()),
        None => println!("{label} -> {}", result.best_cui.as_deref().unwrap_or("-")),
    }
    if result.candidates.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("#"),
        header_cell("CUI"),
        header_cell("SAB"),
        header_cell("TTY"),
        header_cell("Pref"),
        header_cell("Match"),
        header_cell("Key"),
        header_cell("String"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Center);
    for (rank, candidate) in result.candidates.iter().enumerate() {
        table.add_row(candidate_row(rank + 1, candidate));
    }
    println!("{table}");
}

fn candidate_row(rank: usize, candidate: &Candidate) -> Vec<Cell> {
    vec![
        dim_cell(rank),
        Cell::new(&candidate.cui)
            .fg(Color::Blue)
            .add_attribute(Attribute::Bold),
        Cell::new(&candidate.source),
        Cell::new(&candidate.term_type),
        if candidate.preferred {
            Cell::new("✓").fg(Color::Green)
        } else {
            dim_cell("-")
        },
        Cell::new(candidate.matched_key_kind.as_str()),
        Cell::new(&candidate.matched_key),
        Cell::new(&candidate.surface),
    ]
}

pub fn print_keys(keys: &[MentionKeys]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Normalized"),
        header_cell("Canonical"),
        header_cell("Measurement"),
        header_cell("Keys"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Center);
    for mention in keys {
        let key_list = mention
            .keys
            .iter()
            .map(|k| format!("{} [{}]", k.key, k.kind.as_str()))
            .collect::<Vec<_>>()
            .join("\n");
        table.add_row(vec![
            Cell::new(&mention.normalized),
            Cell::new(&mention.canonical),
            if mention.is_measurement {
                Cell::new("yes").fg(Color::Yellow)
            } else {
                dim_cell("no")
            },
            if key_list.is_empty() {
                dim_cell("-")
            } else {
                Cell::new(key_list)
            },
        ]);
    }
    println!("{table}");
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
