use membership::data::{Attribute, Dataset, Record, Schema};
use membership::{use_filter, ClusterMembership, Filter, Gmm};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Two blobs in (x, y) plus a nominal label column. The label is kept in
    // the output but never seen by the mixture model.
    let schema = Schema::new(
        "blobs",
        vec![
            Attribute::numeric("x"),
            Attribute::numeric("y"),
            Attribute::nominal("class", ["near", "far"]),
        ],
    )
    .with_label(2)?;

    let rows = [
        [0.0, 0.0, 0.0],
        [0.1, 0.0, 0.0],
        [0.0, 0.1, 0.0],
        [0.1, 0.1, 0.0],
        [10.0, 10.0, 1.0],
        [10.1, 10.0, 1.0],
        [10.0, 10.1, 1.0],
        [10.1, 10.1, 1.0],
    ];
    let data = Dataset::from_records(
        schema,
        rows.iter().map(|r| Record::new(r.to_vec())).collect(),
    )?;

    let mut filter = ClusterMembership::new(Gmm::new().with_n_components(2).with_seed(7));
    let out = use_filter(&mut filter, &data)?;

    let names: Vec<&str> = out
        .schema()
        .attributes()
        .iter()
        .map(|a| a.name.as_str())
        .collect();
    println!("relation={} columns={:?}", out.schema().relation, names);

    let label = out.schema().label_attribute().ok_or("label column missing")?;
    for record in out.records() {
        let k = record.len() - 1;
        println!(
            "  {:?} -> {}",
            &record.values()[..k],
            label.format_value(record.value(k))
        );
    }

    // After the first batch, new records convert as soon as they arrive.
    filter.input(Record::new(vec![9.8, 9.9, 1.0]))?;
    if let Some(record) = filter.output() {
        println!("streamed: {:?}", record.values());
    }

    Ok(())
}
