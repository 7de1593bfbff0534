use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use mlmc_qoi::accumulator::PowerSumSnapshot;
use mlmc_qoi::qoi::QoiRecord;
use mlmc_qoi::region::Region;

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn align_right(table: &mut Table, from: usize, to: usize) {
    for i in from..=to {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }
}

fn snapshot_cells(s: &PowerSumSnapshot) -> Vec<Cell> {
    // S1..S4 and S10
    [0usize, 1, 2, 3, 9]
        .iter()
        .map(|&i| Cell::new(format!("{:.6e}", s.power_sums[i])))
        .collect()
}

pub fn print_record_report(names: &[String], region: &Region, record: &QoiRecord, max_nodes: usize) {
    let mut table = new_table();
    table.add_row(vec![
        Cell::new("Quantity").add_attribute(Attribute::Bold),
        Cell::new("Mean").fg(Color::Cyan),
        Cell::new("S1"),
        Cell::new("S2"),
        Cell::new("S3"),
        Cell::new("S4"),
        Cell::new("S10"),
        Cell::new("n").add_attribute(Attribute::Bold),
    ]);
    align_right(&mut table, 1, 7);

    let means = record.scalar_means();
    let sums = record.scalar_power_sums();
    for ((name, mean), s) in names.iter().zip(&means).zip(&sums) {
        let mut row = vec![
            Cell::new(name).add_attribute(Attribute::Bold),
            Cell::new(format!("{:.6}", mean)).fg(Color::Cyan),
        ];
        row.extend(snapshot_cells(s));
        row.push(Cell::new(s.count));
        table.add_row(row);
    }

    let node_means = record.node_means();
    let node_sums = record.node_power_sums();
    for ((node, mean), s) in region
        .node_ids()
        .zip(&node_means)
        .zip(&node_sums)
        .take(max_nodes)
    {
        let mut row = vec![
            Cell::new(format!("node {}", node)),
            Cell::new(format!("{:.6}", mean)).fg(Color::Cyan),
        ];
        row.extend(snapshot_cells(s));
        row.push(Cell::new(s.count));
        table.add_row(row);
    }
    println!("\n{}", table);

    if record.node_count() > max_nodes {
        println!("   ... {} more nodes", record.node_count() - max_nodes);
    }
    println!("Record length: {}", record.len());
}

pub fn print_layout_report(names: &[String], node_count: usize) {
    let k = names.len();
    let m = node_count;

    let mut table = new_table();
    table.add_row(vec![
        Cell::new("Block").add_attribute(Attribute::Bold),
        Cell::new("Range"),
        Cell::new("Entries"),
    ]);
    align_right(&mut table, 2, 2);

    let blocks = [
        ("scalar means", 0, k),
        ("nodal weighted means", k, k + m),
        ("scalar power sums", k + m, 2 * k + m),
        ("nodal power sums", 2 * k + m, 2 * (k + m)),
    ];
    for (label, start, end) in blocks {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(format!("[{}, {})", start, end)),
            Cell::new(end - start),
        ]);
    }
    println!("\n{}", table);
    println!("Scalars: {}", names.join(", "));
    println!("Record length: {}", 2 * (k + m));
}
