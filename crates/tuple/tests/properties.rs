//! Property tests for the two codec invariants: order preservation and
//! round-tripping.

use proptest::prelude::*;

use tinyfdb_tuple::{BigInt, Element, Tuple, Versionstamp};

fn arb_element(depth: u32) -> BoxedStrategy<Element> {
    let leaf = prop_oneof![
        prop_oneof![
            Just(Element::Nil),
            any::<bool>().prop_map(Element::Bool),
        ],
        any::<i64>().prop_map(Element::Int),
        any::<u64>().prop_map(Element::Uint),
        (any::<bool>(), proptest::collection::vec(any::<u8>(), 0..12))
            .prop_map(|(neg, mag)| Element::BigInt(BigInt::new(neg, mag))),
        proptest::collection::vec(any::<u8>(), 0..8).prop_map(Element::Bytes),
        ".{0,8}".prop_map(Element::String),
        any::<f32>().prop_map(Element::Float),
        any::<f64>().prop_map(Element::Double),
        any::<[u8; 16]>().prop_map(|b| Element::Uuid(uuid::Uuid::from_bytes(b))),
        (any::<[u8; 10]>(), any::<u16>()).prop_map(|(tx, uv)| {
            Element::Versionstamp(Versionstamp::complete(tx, uv))
        }),
    ];
    if depth == 0 {
        leaf.boxed()
    } else {
        prop_oneof![
            8 => leaf,
            1 => proptest::collection::vec(arb_element(depth - 1), 0..4)
                .prop_map(|es| Element::Tuple(Tuple::from_elements(es))),
        ]
        .boxed()
    }
}

fn arb_tuple() -> impl Strategy<Value = Tuple> {
    proptest::collection::vec(arb_element(2), 0..6).prop_map(Tuple::from_elements)
}

fn packable(t: &Tuple) -> Option<Vec<u8>> {
    // Complete versionstamps always pack; the generator never produces
    // incomplete ones, so pack can only fail on oversized magnitudes,
    // which the generator also cannot produce.
    t.pack().ok()
}

proptest! {
    #[test]
    fn structural_and_byte_order_agree(a in arb_tuple(), b in arb_tuple()) {
        let (pa, pb) = match (packable(&a), packable(&b)) {
            (Some(pa), Some(pb)) => (pa, pb),
            _ => return Ok(()),
        };
        prop_assert_eq!(
            a.cmp(&b),
            pa.cmp(&pb),
            "tuple order and byte order disagree for {} vs {}",
            a,
            b
        );
    }

    #[test]
    fn unpack_inverts_pack(t in arb_tuple()) {
        let packed = match packable(&t) {
            Some(p) => p,
            None => return Ok(()),
        };
        let back = Tuple::unpack(&packed).unwrap();
        prop_assert_eq!(&back, &t, "round trip changed {}", t);
        // Re-packing the normalized tuple is byte-identical.
        prop_assert_eq!(back.pack().unwrap(), packed);
    }
}
