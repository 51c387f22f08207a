use lyb::context::Context;
use lyb::data::{
    AnyDataValue, Data, DataParserFlags, DataPrinterFlags, DataTree,
};
use lyb::schema::{DataValue, DataValueType, LeafType};
use lyb::ErrorCode;

// ===== helpers =====

fn assert_any_equal(a: &AnyDataValue<'_>, b: &AnyDataValue<'_>) {
    match (a, b) {
        (AnyDataValue::ConstString(x), AnyDataValue::ConstString(y))
        | (AnyDataValue::Json(x), AnyDataValue::Json(y))
        | (AnyDataValue::SubXml(x), AnyDataValue::SubXml(y))
        | (AnyDataValue::Xml(x), AnyDataValue::Xml(y)) => assert_eq!(x, y),
        (AnyDataValue::Lyb(x), AnyDataValue::Lyb(y)) => assert_eq!(x, y),
        (AnyDataValue::DataTree(x), AnyDataValue::DataTree(y)) => {
            assert_trees_equal(x, y)
        }
        _ => panic!("anydata value kinds differ"),
    }
}

fn assert_trees_equal(a: &DataTree<'_>, b: &DataTree<'_>) {
    let a_nodes = a.traverse().collect::<Vec<_>>();
    let b_nodes = b.traverse().collect::<Vec<_>>();
    assert_eq!(a_nodes.len(), b_nodes.len());

    for (x, y) in a_nodes.iter().zip(&b_nodes) {
        assert_eq!(x.path(), y.path());
        assert_eq!(x.schema().path(), y.schema().path());
        assert_eq!(x.value(), y.value());
        assert_eq!(x.value_canonical(), y.value_canonical());
        assert_eq!(x.is_default(), y.is_default());
        assert_eq!(x.is_unresolved(), y.is_unresolved());

        let x_meta = x
            .meta()
            .map(|m| {
                (
                    m.module().name().to_string(),
                    m.name().to_string(),
                    m.value_canonical().to_string(),
                )
            })
            .collect::<Vec<_>>();
        let y_meta = y
            .meta()
            .map(|m| {
                (
                    m.module().name().to_string(),
                    m.name().to_string(),
                    m.value_canonical().to_string(),
                )
            })
            .collect::<Vec<_>>();
        assert_eq!(x_meta, y_meta);

        match (x.any_value(), y.any_value()) {
            (None, None) => (),
            (Some(xv), Some(yv)) => assert_any_equal(xv, yv),
            _ => panic!("anydata value presence differs"),
        }
    }
}

fn roundtrip<'a>(ctx: &'a Context, dtree: &DataTree<'a>) -> DataTree<'a> {
    let bytes = dtree.print_bytes(DataPrinterFlags::WITH_SIBLINGS).unwrap();
    // Printing is deterministic.
    assert_eq!(
        bytes,
        dtree.print_bytes(DataPrinterFlags::WITH_SIBLINGS).unwrap()
    );
    let parsed =
        DataTree::parse_lyb(ctx, &bytes, DataParserFlags::STRICT).unwrap();
    assert_trees_equal(dtree, &parsed);
    parsed
}

fn u16le(bytes: &[u8], offset: usize) -> u16 {
    bytes[offset] as u16 | (bytes[offset + 1] as u16) << 8
}

// Model registry section of a printed stream.
fn read_models(bytes: &[u8]) -> Vec<(String, u16)> {
    let mut offset = 1;
    let count = u16le(bytes, offset);
    offset += 2;
    let mut models = Vec::new();
    for _ in 0..count {
        let len = u16le(bytes, offset) as usize;
        offset += 2;
        let name =
            String::from_utf8(bytes[offset..offset + len].to_vec()).unwrap();
        offset += len;
        let revision = u16le(bytes, offset);
        offset += 2;
        models.push((name, revision));
    }
    models
}

// ===== tests =====

#[test]
fn roundtrip_all_value_types() {
    let mut ctx = Context::new();
    let module = ctx.new_module("types", None, "urn:types").unwrap();
    let top = ctx.new_container(module, None, "all").unwrap();

    let types: &[(&str, LeafType)] = &[
        ("b", LeafType::new(DataValueType::Binary)),
        ("s", LeafType::new(DataValueType::String)),
        ("i8", LeafType::new(DataValueType::Int8)),
        ("i16", LeafType::new(DataValueType::Int16)),
        ("i32", LeafType::new(DataValueType::Int32)),
        ("i64", LeafType::new(DataValueType::Int64)),
        ("u8", LeafType::new(DataValueType::Uint8)),
        ("u16", LeafType::new(DataValueType::Uint16)),
        ("u32", LeafType::new(DataValueType::Uint32)),
        ("u64", LeafType::new(DataValueType::Uint64)),
        ("ok", LeafType::new(DataValueType::Bool)),
        ("present", LeafType::new(DataValueType::Empty)),
        ("ratio", LeafType::dec64(2)),
        ("state", LeafType::enumeration(["up", "down", "testing"])),
        ("flags", LeafType::bits(["a", "b", "c", "d", "e", "f", "g", "h", "i"])),
        ("kind", LeafType::new(DataValueType::IdentityRef)),
        ("target", LeafType::new(DataValueType::InstanceId)),
        ("mixed", LeafType::new(DataValueType::Union)),
        ("custom", LeafType::new(DataValueType::Uint8).user()),
    ];
    for (name, ltype) in types {
        ctx.new_leaf(module, Some(top), name, ltype.clone()).unwrap();
    }
    let u8_leaf = ctx
        .get_module("types", None)
        .unwrap()
        .top_nodes()
        .next()
        .unwrap()
        .children()
        .find(|snode| snode.name() == "u8")
        .unwrap()
        .id();
    ctx.new_leaf(module, Some(top), "ref", LeafType::leafref(u8_leaf))
        .unwrap();

    let values: &[(&str, &str)] = &[
        ("b", "aGVsbG8="),
        ("s", "a string"),
        ("i8", "-100"),
        ("i16", "-30000"),
        ("i32", "-2000000000"),
        ("i64", "-9000000000000000000"),
        ("u8", "200"),
        ("u16", "60000"),
        ("u32", "4000000000"),
        ("u64", "18000000000000000000"),
        ("ok", "true"),
        ("present", ""),
        ("ratio", "-3.25"),
        ("state", "testing"),
        ("flags", "a c i"),
        ("kind", "types:special"),
        ("target", "/types:all/s"),
        ("mixed", "anything"),
        ("custom", "42"),
        ("ref", "200"),
    ];
    let mut dtree = DataTree::new(&ctx);
    for (name, value) in values {
        dtree
            .new_path(&format!("/types:all/{}", name), Some(value))
            .unwrap();
    }

    let parsed = roundtrip(&ctx, &dtree);
    assert_eq!(
        parsed.find_path("/types:all/i64").unwrap().value(),
        Some(&DataValue::Int64(-9000000000000000000))
    );
    assert_eq!(
        parsed.find_path("/types:all/ratio").unwrap().value(),
        Some(&DataValue::Dec64(-325))
    );
    assert_eq!(
        parsed.find_path("/types:all/flags").unwrap().value_canonical(),
        Some("a c i")
    );
    assert_eq!(
        parsed.find_path("/types:all/ref").unwrap().value(),
        Some(&DataValue::Uint8(200))
    );
}

#[test]
fn roundtrip_lists_and_leaf_lists() {
    let mut ctx = Context::new();
    let module = ctx.new_module("inv", None, "urn:inv").unwrap();
    let top = ctx.new_container(module, None, "inventory").unwrap();
    let item = ctx.new_list(module, Some(top), "item").unwrap();
    ctx.new_leaf(
        module,
        Some(item),
        "name",
        LeafType::new(DataValueType::String),
    )
    .unwrap();
    ctx.new_leaf_list(
        module,
        Some(item),
        "tag",
        LeafType::new(DataValueType::String),
    )
    .unwrap();

    let mut dtree = DataTree::new(&ctx);
    for i in 0..5 {
        let entry = dtree.new_path("/inv:inventory/item", None).unwrap();
        let snode = dtree
            .node_ref(entry)
            .schema()
            .children()
            .find(|snode| snode.name() == "name")
            .unwrap()
            .id();
        dtree
            .new_term_str(Some(entry), snode, &format!("item{}", i))
            .unwrap();
        let tag = dtree
            .node_ref(entry)
            .schema()
            .children()
            .find(|snode| snode.name() == "tag")
            .unwrap()
            .id();
        for t in 0..3 {
            dtree
                .new_term_str(Some(entry), tag, &format!("tag{}", t))
                .unwrap();
        }
    }

    let parsed = roundtrip(&ctx, &dtree);
    assert_eq!(parsed.traverse().count(), 1 + 5 * (1 + 1 + 3));
}

#[test]
fn roundtrip_metadata() {
    let mut ctx = Context::new();
    let module = ctx.new_module("m", None, "urn:m").unwrap();
    ctx.new_annotation(
        module,
        "operation",
        LeafType::enumeration(["none", "create", "delete", "replace"]),
    )
    .unwrap();
    ctx.new_annotation(module, "weight", LeafType::new(DataValueType::Uint32))
        .unwrap();
    let cont = ctx.new_container(module, None, "c").unwrap();
    ctx.new_leaf(module, Some(cont), "x", LeafType::new(DataValueType::String))
        .unwrap();

    let mut dtree = DataTree::new(&ctx);
    let top = dtree.new_path("/m:c", None).unwrap();
    let leaf = dtree.new_path("/m:c/x", Some("v")).unwrap();
    dtree
        .new_meta(top, module, "operation", DataValue::Other("create".into()))
        .unwrap();
    dtree
        .new_meta(leaf, module, "operation", DataValue::Other("delete".into()))
        .unwrap();
    dtree
        .new_meta(leaf, module, "weight", DataValue::Uint32(7))
        .unwrap();

    roundtrip(&ctx, &dtree);
}

#[test]
fn roundtrip_default_flag() {
    let mut ctx = Context::new();
    let module = ctx.new_module("m", None, "urn:m").unwrap();
    let leaf = ctx
        .new_leaf(module, None, "mtu", LeafType::new(DataValueType::Uint16))
        .unwrap();

    let mut dtree = DataTree::new(&ctx);
    let node = dtree
        .new_term(None, leaf, DataValue::Uint16(1500))
        .unwrap();
    dtree.set_default(node, true).unwrap();

    let parsed = roundtrip(&ctx, &dtree);
    assert!(parsed.roots().next().unwrap().is_default());
}

#[test]
fn roundtrip_unresolved_leafref() {
    let mut ctx = Context::new();
    let module = ctx.new_module("m", None, "urn:m").unwrap();
    let target = ctx
        .new_leaf(module, None, "t", LeafType::new(DataValueType::Uint8))
        .unwrap();
    let leaf = ctx
        .new_leaf(module, None, "r", LeafType::leafref(target))
        .unwrap();

    let mut dtree = DataTree::new(&ctx);
    dtree.new_term_unresolved(None, leaf, "dangling").unwrap();

    let parsed = roundtrip(&ctx, &dtree);
    let node = parsed.roots().next().unwrap();
    assert!(node.is_unresolved());
    assert_eq!(node.value_canonical(), Some("dangling"));
}

#[test]
fn roundtrip_anydata() {
    let mut ctx = Context::new();
    let module = ctx.new_module("m", None, "urn:m").unwrap();
    let cont = ctx.new_container(module, None, "c").unwrap();
    ctx.new_anydata(module, Some(cont), "blob").unwrap();
    ctx.new_leaf(module, Some(cont), "x", LeafType::new(DataValueType::Uint8))
        .unwrap();

    let any_snode = ctx
        .get_module("m", None)
        .unwrap()
        .top_nodes()
        .next()
        .unwrap()
        .children()
        .find(|snode| snode.name() == "blob")
        .unwrap()
        .id();

    for value in [
        AnyDataValue::ConstString("plain text".to_string()),
        AnyDataValue::Json("{\"a\": 1}".to_string()),
        AnyDataValue::SubXml("<frag/>".to_string()),
        AnyDataValue::Lyb(vec![0x00, 0xff, 0x42, 0x00]),
    ] {
        let mut dtree = DataTree::new(&ctx);
        let top = dtree.new_path("/m:c", None).unwrap();
        dtree.new_any(Some(top), any_snode, value).unwrap();
        roundtrip(&ctx, &dtree);
    }

    // A nested data tree is embedded as a complete stream.
    let mut nested = DataTree::new(&ctx);
    nested.new_path("/m:c/x", Some("7")).unwrap();
    let mut dtree = DataTree::new(&ctx);
    let top = dtree.new_path("/m:c", None).unwrap();
    dtree
        .new_any(Some(top), any_snode, AnyDataValue::DataTree(Box::new(nested)))
        .unwrap();
    roundtrip(&ctx, &dtree);
}

#[test]
fn anydata_xml_is_canonicalized() {
    let mut ctx = Context::new();
    let module = ctx.new_module("m", None, "urn:m").unwrap();
    let any = ctx.new_anydata(module, None, "blob").unwrap();

    let mut dtree = DataTree::new(&ctx);
    dtree
        .new_any(None, any, AnyDataValue::Xml("<a>1</a>".to_string()))
        .unwrap();

    let bytes = dtree.print_bytes(DataPrinterFlags::empty()).unwrap();
    let parsed =
        DataTree::parse_lyb(&ctx, &bytes, DataParserFlags::STRICT).unwrap();
    match parsed.roots().next().unwrap().any_value().unwrap() {
        AnyDataValue::ConstString(s) => assert_eq!(s, "<a>1</a>"),
        other => panic!("unexpected anydata value {:?}", other),
    }
}

#[test]
fn boundary_string_lengths() {
    let mut ctx = Context::new();
    let module = ctx.new_module("m", None, "urn:m").unwrap();
    let leaf = ctx
        .new_leaf(module, None, "s", LeafType::new(DataValueType::String))
        .unwrap();

    for len in [0, 1, 254, 255, 256, 1000] {
        let value = "x".repeat(len);
        let mut dtree = DataTree::new(&ctx);
        dtree.new_term_str(None, leaf, &value).unwrap();
        let parsed = roundtrip(&ctx, &dtree);
        assert_eq!(
            parsed.roots().next().unwrap().value_canonical(),
            Some(value.as_str())
        );
    }
}

#[test]
fn deep_nesting() {
    let mut ctx = Context::new();
    let module = ctx.new_module("deep", None, "urn:deep").unwrap();
    let mut parent = None;
    for i in 0..40 {
        let cont = ctx
            .new_container(module, parent, &format!("level{}", i))
            .unwrap();
        parent = Some(cont);
    }
    ctx.new_leaf(
        module,
        parent,
        "x",
        LeafType::new(DataValueType::String),
    )
    .unwrap();

    let path = (0..40).fold("/deep:level0".to_string(), |mut acc, i| {
        if i > 0 {
            acc.push_str(&format!("/level{}", i));
        }
        acc
    }) + "/x";

    let mut dtree = DataTree::new(&ctx);
    dtree.new_path(&path, Some("deep value")).unwrap();

    let parsed = roundtrip(&ctx, &dtree);
    assert_eq!(
        parsed.find_path(&path).unwrap().value_canonical(),
        Some("deep value")
    );
}

#[test]
fn many_siblings_force_hash_collisions() {
    let mut ctx = Context::new();
    let module = ctx.new_module("wide", None, "urn:wide").unwrap();
    let top = ctx.new_container(module, None, "c").unwrap();
    // More siblings than 7-bit hash payload values, so some tags must
    // carry collision continuation bytes.
    for i in 0..200 {
        ctx.new_leaf(
            module,
            Some(top),
            &format!("leaf{}", i),
            LeafType::new(DataValueType::Uint32),
        )
        .unwrap();
    }

    let mut dtree = DataTree::new(&ctx);
    for i in 0..200 {
        let value = i.to_string();
        dtree
            .new_path(&format!("/wide:c/leaf{}", i), Some(value.as_str()))
            .unwrap();
    }

    let parsed = roundtrip(&ctx, &dtree);
    assert_eq!(
        parsed.find_path("/wide:c/leaf137").unwrap().value(),
        Some(&DataValue::Uint32(137))
    );
}

#[test]
fn structural_nodes_are_transparent() {
    let mut ctx = Context::new();
    let module = ctx.new_module("m", None, "urn:m").unwrap();
    let top = ctx.new_container(module, None, "c").unwrap();
    let choice = ctx.new_choice(module, Some(top), "how").unwrap();
    let case_a = ctx.new_case(module, choice, "a").unwrap();
    let l1 = ctx
        .new_leaf(module, Some(case_a), "l1", LeafType::new(DataValueType::Uint8))
        .unwrap();
    let case_b = ctx.new_case(module, choice, "b").unwrap();
    ctx.new_leaf(module, Some(case_b), "l2", LeafType::new(DataValueType::Uint8))
        .unwrap();
    let uses = ctx.new_uses(module, Some(top), "grp").unwrap();
    let l3 = ctx
        .new_leaf(module, Some(uses), "l3", LeafType::new(DataValueType::Uint8))
        .unwrap();

    // Data children of the container hop over choice/case/uses.
    let mut dtree = DataTree::new(&ctx);
    let cont = dtree.new_inner(None, top).unwrap();
    dtree.new_term(Some(cont), l1, DataValue::Uint8(1)).unwrap();
    dtree.new_term(Some(cont), l3, DataValue::Uint8(3)).unwrap();

    let parsed = roundtrip(&ctx, &dtree);
    assert_eq!(parsed.find_path("/m:c/l1").unwrap().value(), Some(&DataValue::Uint8(1)));
    assert_eq!(parsed.find_path("/m:c/l3").unwrap().value(), Some(&DataValue::Uint8(3)));
}

#[test]
fn rpc_mode_skips_output_branch() {
    let mut ctx = Context::new();
    let module = ctx.new_module("m", None, "urn:m").unwrap();
    let rpc = ctx.new_rpc(module, "activate").unwrap();
    let input = ctx.rpc_input(rpc).unwrap();
    let output = ctx.rpc_output(rpc).unwrap();
    let in_leaf = ctx
        .new_leaf(module, Some(input), "name", LeafType::new(DataValueType::String))
        .unwrap();
    let out_leaf = ctx
        .new_leaf(module, Some(output), "result", LeafType::new(DataValueType::String))
        .unwrap();

    let mut dtree = DataTree::new(&ctx);
    let invocation = dtree.new_inner(None, rpc).unwrap();
    dtree
        .new_term_str(Some(invocation), in_leaf, "eth0")
        .unwrap();
    dtree
        .new_term_str(Some(invocation), out_leaf, "ok")
        .unwrap();

    // Request: the output node is silently left out.
    let bytes = dtree.print_bytes(DataPrinterFlags::RPC).unwrap();
    let parsed =
        DataTree::parse_lyb(&ctx, &bytes, DataParserFlags::RPC).unwrap();
    let children = parsed
        .roots()
        .next()
        .unwrap()
        .children()
        .map(|dnode| dnode.schema().name().to_string())
        .collect::<Vec<_>>();
    assert_eq!(children, vec!["name"]);

    // Reply: the input node is silently left out.
    let bytes = dtree.print_bytes(DataPrinterFlags::RPC_REPLY).unwrap();
    let parsed = DataTree::parse_lyb(&ctx, &bytes, DataParserFlags::RPC_REPLY)
        .unwrap();
    let children = parsed
        .roots()
        .next()
        .unwrap()
        .children()
        .map(|dnode| dnode.schema().name().to_string())
        .collect::<Vec<_>>();
    assert_eq!(children, vec!["result"]);
}

#[test]
fn roundtrip_notification_and_action() {
    let mut ctx = Context::new();
    let module = ctx.new_module("m", None, "urn:m").unwrap();

    let notif = ctx.new_notification(module, None, "link-down").unwrap();
    ctx.new_leaf(
        module,
        Some(notif),
        "if-name",
        LeafType::new(DataValueType::String),
    )
    .unwrap();

    let cont = ctx.new_container(module, None, "server").unwrap();
    let action = ctx.new_action(module, cont, "reset").unwrap();
    let input = ctx.rpc_input(action).unwrap();
    let delay = ctx
        .new_leaf(
            module,
            Some(input),
            "delay",
            LeafType::new(DataValueType::Uint32),
        )
        .unwrap();

    let mut dtree = DataTree::new(&ctx);
    dtree.new_path("/m:link-down/if-name", Some("eth0")).unwrap();
    roundtrip(&ctx, &dtree);

    let mut dtree = DataTree::new(&ctx);
    let top = dtree.new_path("/m:server", None).unwrap();
    let invocation = dtree.new_inner(Some(top), action).unwrap();
    dtree
        .new_term(Some(invocation), delay, DataValue::Uint32(3))
        .unwrap();
    let parsed = roundtrip(&ctx, &dtree);
    assert_eq!(
        parsed.find_path("/m:server/reset/delay").unwrap().value(),
        Some(&DataValue::Uint32(3))
    );
}

#[test]
fn with_siblings_controls_the_forest() {
    let mut ctx = Context::new();
    let module = ctx.new_module("m", None, "urn:m").unwrap();
    ctx.new_container(module, None, "c1").unwrap();
    ctx.new_container(module, None, "c2").unwrap();

    let mut dtree = DataTree::new(&ctx);
    dtree.new_path("/m:c1", None).unwrap();
    let second = dtree.new_path("/m:c2", None).unwrap();

    let bytes = dtree.print_bytes(DataPrinterFlags::empty()).unwrap();
    let parsed =
        DataTree::parse_lyb(&ctx, &bytes, DataParserFlags::STRICT).unwrap();
    assert_eq!(parsed.roots().count(), 1);
    assert_eq!(parsed.roots().next().unwrap().schema().name(), "c1");

    // Printing a node reference starts the forest there.
    let bytes = dtree
        .node_ref(second)
        .print_bytes(DataPrinterFlags::empty())
        .unwrap();
    let parsed =
        DataTree::parse_lyb(&ctx, &bytes, DataParserFlags::STRICT).unwrap();
    assert_eq!(parsed.roots().next().unwrap().schema().name(), "c2");

    let bytes = dtree.print_bytes(DataPrinterFlags::WITH_SIBLINGS).unwrap();
    // Two top-level nodes from one module yield a single registry entry.
    assert_eq!(read_models(&bytes).len(), 1);
    let parsed =
        DataTree::parse_lyb(&ctx, &bytes, DataParserFlags::STRICT).unwrap();
    assert_eq!(parsed.roots().count(), 2);
}

#[test]
fn model_registry_closure() {
    let mut ctx = Context::new();
    let a = ctx.new_module("a", Some("2016-02-28"), "urn:a").unwrap();
    let root = ctx.new_container(a, None, "root").unwrap();

    // b augments /a:root.
    let b = ctx.new_module("b", None, "urn:b").unwrap();
    ctx.new_augment(b, root).unwrap();
    let x = ctx
        .new_leaf(b, Some(root), "x", LeafType::new(DataValueType::Uint8))
        .unwrap();

    // c deviates /a:root.
    let c = ctx.new_module("c", None, "urn:c").unwrap();
    ctx.new_deviation(c, root).unwrap();

    // d's submodule augments /a:root.
    let d = ctx.new_module("d", None, "urn:d").unwrap();
    let sd = ctx.new_submodule(d, "d-sub").unwrap();
    ctx.new_submodule_augment(sd, root).unwrap();

    // e would qualify but is not implemented.
    let e = ctx.new_module("e", None, "urn:e").unwrap();
    ctx.new_augment(e, root).unwrap();
    ctx.set_implemented(e, false).unwrap();

    let mut dtree = DataTree::new(&ctx);
    let top = dtree.new_inner(None, root).unwrap();
    dtree.new_term(Some(top), x, DataValue::Uint8(1)).unwrap();

    let bytes = dtree.print_bytes(DataPrinterFlags::WITH_SIBLINGS).unwrap();
    let models = read_models(&bytes);
    assert_eq!(
        models
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>(),
        vec!["a", "b", "c", "d"]
    );
    // Packed yyyyyyymmmmddddd revision of 2016-02-28.
    assert_eq!(models[0].1, (16 << 9) | (2 << 5) | 28);
    assert_eq!(models[1].1, 0);

    roundtrip(&ctx, &dtree);
}

#[test]
fn unknown_registry_module_lenient_vs_strict() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut ctx = Context::new();
    let a = ctx.new_module("a", None, "urn:a").unwrap();
    let root = ctx.new_container(a, None, "root").unwrap();
    let b = ctx.new_module("b", None, "urn:b").unwrap();
    ctx.new_augment(b, root).unwrap();

    // Data uses only module a, but the registry closure still names b.
    let mut dtree = DataTree::new(&ctx);
    dtree.new_inner(None, root).unwrap();
    let bytes = dtree.print_bytes(DataPrinterFlags::WITH_SIBLINGS).unwrap();
    assert_eq!(read_models(&bytes).len(), 2);

    // A context that never learned about b.
    let mut ctx2 = Context::new();
    let a2 = ctx2.new_module("a", None, "urn:a").unwrap();
    ctx2.new_container(a2, None, "root").unwrap();

    assert!(
        DataTree::parse_lyb(&ctx2, &bytes, DataParserFlags::empty()).is_ok()
    );
    assert_eq!(
        DataTree::parse_lyb(&ctx2, &bytes, DataParserFlags::STRICT)
            .unwrap_err()
            .errcode,
        ErrorCode::NotFound
    );
}

#[test]
fn module_revision_must_match() {
    let mut ctx = Context::new();
    let a = ctx.new_module("a", Some("2020-01-01"), "urn:a").unwrap();
    ctx.new_container(a, None, "root").unwrap();

    let mut dtree = DataTree::new(&ctx);
    dtree.new_path("/a:root", None).unwrap();
    let bytes = dtree.print_bytes(DataPrinterFlags::WITH_SIBLINGS).unwrap();

    let mut ctx2 = Context::new();
    let a2 = ctx2.new_module("a", Some("2021-12-31"), "urn:a").unwrap();
    ctx2.new_container(a2, None, "root").unwrap();

    assert_eq!(
        DataTree::parse_lyb(&ctx2, &bytes, DataParserFlags::empty())
            .unwrap_err()
            .errcode,
        ErrorCode::NotFound
    );
}

#[test]
fn sink_variants_agree() {
    let mut ctx = Context::new();
    let module = ctx.new_module("m", None, "urn:m").unwrap();
    let cont = ctx.new_container(module, None, "c").unwrap();
    ctx.new_leaf(module, Some(cont), "x", LeafType::new(DataValueType::String))
        .unwrap();

    let mut dtree = DataTree::new(&ctx);
    let value = "y".repeat(700);
    dtree.new_path("/m:c/x", Some(value.as_str())).unwrap();

    let bytes = dtree.print_bytes(DataPrinterFlags::WITH_SIBLINGS).unwrap();

    let mut writer_out = Vec::new();
    dtree
        .print_writer(&mut writer_out, DataPrinterFlags::WITH_SIBLINGS)
        .unwrap();
    assert_eq!(writer_out, bytes);

    // A callback consuming a few bytes at a time.
    let mut clb_out = Vec::new();
    dtree
        .print_clb(
            |buf| {
                let n = buf.len().min(3);
                clb_out.extend_from_slice(&buf[..n]);
                Ok(n)
            },
            DataPrinterFlags::WITH_SIBLINGS,
        )
        .unwrap();
    assert_eq!(clb_out, bytes);
}

#[test]
fn print_argument_validation() {
    let mut ctx = Context::new();
    let module = ctx.new_module("m", None, "urn:m").unwrap();
    ctx.new_container(module, None, "c").unwrap();

    // An empty tree has nothing to print.
    let dtree = DataTree::new(&ctx);
    assert_eq!(
        dtree
            .print_bytes(DataPrinterFlags::WITH_SIBLINGS)
            .unwrap_err()
            .errcode,
        ErrorCode::InvalidArgument
    );

    // Both RPC directions at once make no sense.
    let mut dtree = DataTree::new(&ctx);
    dtree.new_path("/m:c", None).unwrap();
    assert_eq!(
        dtree
            .print_bytes(DataPrinterFlags::RPC | DataPrinterFlags::RPC_REPLY)
            .unwrap_err()
            .errcode,
        ErrorCode::InvalidArgument
    );
}

#[test]
fn parse_rejects_trailing_garbage() {
    let mut ctx = Context::new();
    let module = ctx.new_module("m", None, "urn:m").unwrap();
    ctx.new_container(module, None, "c").unwrap();

    let mut dtree = DataTree::new(&ctx);
    dtree.new_path("/m:c", None).unwrap();
    let mut bytes = dtree.print_bytes(DataPrinterFlags::WITH_SIBLINGS).unwrap();
    bytes.push(0xab);

    assert_eq!(
        DataTree::parse_lyb(&ctx, &bytes, DataParserFlags::empty())
            .unwrap_err()
            .errcode,
        ErrorCode::InvalidData
    );
}

#[test]
fn parse_rejects_truncation() {
    let mut ctx = Context::new();
    let module = ctx.new_module("m", None, "urn:m").unwrap();
    let cont = ctx.new_container(module, None, "c").unwrap();
    ctx.new_leaf(module, Some(cont), "x", LeafType::new(DataValueType::String))
        .unwrap();

    let mut dtree = DataTree::new(&ctx);
    dtree.new_path("/m:c/x", Some("hello")).unwrap();
    let bytes = dtree.print_bytes(DataPrinterFlags::WITH_SIBLINGS).unwrap();

    for len in [0, 1, 5, bytes.len() / 2, bytes.len() - 1] {
        assert!(
            DataTree::parse_lyb(&ctx, &bytes[..len], DataParserFlags::empty())
                .is_err(),
            "truncation at {} must not parse",
            len
        );
    }
}
