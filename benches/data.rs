use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use lyb::context::Context;
use lyb::data::{Data, DataParserFlags, DataPrinterFlags, DataTree};
use lyb::schema::{DataValueType, LeafType};

fn create_context() -> Context {
    let mut ctx = Context::new();
    let module = ctx
        .new_module("ietf-interfaces", Some("2018-02-20"), "urn:ietf-interfaces")
        .expect("Failed to create module");
    let top = ctx
        .new_container(module, None, "interfaces")
        .expect("Failed to create container");
    let iface = ctx
        .new_list(module, Some(top), "interface")
        .expect("Failed to create list");
    for (name, ltype) in [
        ("name", LeafType::new(DataValueType::String)),
        ("description", LeafType::new(DataValueType::String)),
        ("type", LeafType::new(DataValueType::IdentityRef)),
        ("enabled", LeafType::new(DataValueType::Bool)),
        ("mtu", LeafType::new(DataValueType::Uint16)),
    ] {
        ctx.new_leaf(module, Some(iface), name, ltype)
            .expect("Failed to create leaf");
    }
    ctx
}

fn data_generate(ctx: &Context, interfaces: u32) -> DataTree<'_> {
    let iface = ctx
        .get_module("ietf-interfaces", None)
        .expect("Unknown module")
        .top_nodes()
        .next()
        .expect("Empty module")
        .first_child()
        .expect("Empty container");
    let leaf_id = |name: &str| {
        iface
            .children()
            .find(|snode| snode.name() == name)
            .expect("Unknown leaf")
            .id()
    };

    let mut dtree = DataTree::new(ctx);
    for i in 1..=interfaces {
        let entry = dtree
            .new_path("/ietf-interfaces:interfaces/interface", None)
            .expect("Failed to edit data tree");
        let changes = [
            (leaf_id("name"), format!("eth{}", i)),
            (leaf_id("type"), "iana-if-type:ethernetCsmacd".to_string()),
            (leaf_id("enabled"), "true".to_string()),
            (leaf_id("mtu"), "1500".to_string()),
        ];
        for (snode, value) in &changes {
            dtree
                .new_term_str(Some(entry), *snode, value)
                .expect("Failed to edit data tree");
        }
    }

    dtree
}

fn criterion_benchmark(c: &mut Criterion) {
    let tree_sizes = [256, 1024, 4 * 1024, 16 * 1024];

    let ctx = create_context();

    let mut group = c.benchmark_group("print_bytes(LYB) / tree size");
    for size in &tree_sizes {
        let dtree = data_generate(&ctx, *size);

        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            size,
            |b, _size| {
                b.iter(|| {
                    dtree
                        .print_bytes(DataPrinterFlags::WITH_SIBLINGS)
                        .expect("Failed to print data tree")
                });
            },
        );
    }
    group.finish();

    let mut group = c.benchmark_group("parse_lyb / tree size");
    for size in &tree_sizes {
        let dtree = data_generate(&ctx, *size);
        let bytes = dtree
            .print_bytes(DataPrinterFlags::WITH_SIBLINGS)
            .expect("Failed to print data tree");

        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            size,
            |b, _size| {
                b.iter(|| {
                    DataTree::parse_lyb(&ctx, &bytes, DataParserFlags::STRICT)
                        .expect("Failed to parse data tree")
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
