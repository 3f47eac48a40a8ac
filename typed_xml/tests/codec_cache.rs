//! Codec reuse, cache policy switching and the shared serializer

use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use typed_xml::logging::{self, TracingLevel};
use typed_xml::{Serializer, SerializerConfig, TypeDescriptor};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Invoice {
    number: u32,
    total:  f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Customer {
    name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "Invoice")]
struct Clashing {
    code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SharedOnly {
    value: u8,
}

#[test]
fn repeated_use_reuses_one_codec() {
    let serializer = Serializer::new();
    let invoice = Invoice {
        number: 17,
        total:  42.5,
    };

    for _ in 0..5 {
        let xml = serializer.serialize_to_string(&invoice).expect("serialize");
        let back: Invoice = serializer
            .deserialize_with_types(&xml, &[])
            .expect("deserialize");
        assert_eq!(back, invoice);
    }

    assert_eq!(serializer.cache().codecs_built(), 1);
    let first = serializer.codec::<Invoice>(&[]).expect("codec");
    let second = serializer.codec::<Invoice>(&[]).expect("codec");
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn disable_then_enable_caching() {
    let serializer = Serializer::new();
    let invoice = Invoice {
        number: 1,
        total:  2.0,
    };

    serializer.set_cache_codecs(false);
    assert!(!serializer.cache_codecs());
    serializer.serialize_to_string(&invoice).expect("serialize");
    serializer.serialize_to_string(&invoice).expect("serialize");
    assert!(!serializer.cache().contains::<Invoice>());
    assert_eq!(serializer.cache().codecs_built(), 2);

    serializer.set_cache_codecs(true);
    serializer.serialize_to_string(&invoice).expect("serialize");
    serializer.serialize_to_string(&invoice).expect("serialize");
    assert!(serializer.cache().contains::<Invoice>());
    assert_eq!(serializer.cache().codecs_built(), 3);
}

#[test]
fn disabled_from_configuration() {
    let config = SerializerConfig::from_json_str(r#"{"cache_codecs": false}"#).expect("config");
    let serializer = Serializer::with_config(config);

    let first = serializer.codec::<Customer>(&[]).expect("codec");
    let second = serializer.codec::<Customer>(&[]).expect("codec");
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(serializer.cache().is_empty());
}

#[test]
fn auxiliary_types_only_shape_the_first_construction() {
    let serializer = Serializer::new();
    let aux = [TypeDescriptor::of::<Customer>()];

    let with_aux = serializer.codec::<Invoice>(&aux).expect("codec");
    let without_aux = serializer.codec::<Invoice>(&[]).expect("codec");

    assert!(Arc::ptr_eq(&with_aux, &without_aux));
    assert_eq!(without_aux.auxiliary_types(), aux.to_vec());
}

#[test]
fn construction_failure_is_reported_and_not_cached() {
    let serializer = Serializer::new();
    let clash = [TypeDescriptor::of::<Clashing>()];
    let invoice = Invoice {
        number: 3,
        total:  9.0,
    };

    let report = serializer
        .serialize_to_string_with(&invoice, &clash, None)
        .expect_err("root element clash");
    assert!(report.current_context().is_construction());
    assert!(!serializer.cache().contains::<Invoice>());

    // Without the clashing auxiliary type the same primary type builds fine
    serializer.serialize_to_string(&invoice).expect("serialize");
    assert!(serializer.cache().contains::<Invoice>());
}

#[test]
fn concurrent_first_use_builds_once() {
    let serializer = Serializer::new();

    thread::scope(|scope| {
        for n in 0..8 {
            let serializer = &serializer;
            scope.spawn(move || {
                let customer = Customer {
                    name: format!("customer {n}"),
                };
                let xml = serializer.serialize_to_string(&customer).expect("serialize");
                let back: Customer = serializer
                    .deserialize_with_types(&xml, &[])
                    .expect("deserialize");
                assert_eq!(back, customer);
            });
        }
    });

    assert_eq!(serializer.cache().codecs_built(), 1);
    assert_eq!(serializer.cache().len(), 1);
}

#[test]
fn shared_serializer_is_a_single_instance() {
    let first = Serializer::shared();
    let second = Serializer::shared();
    assert!(std::ptr::eq(first, second));

    let xml = first
        .serialize_to_string(&SharedOnly { value: 7 })
        .expect("serialize");
    assert!(second.cache().contains::<SharedOnly>());
    assert_eq!(
        second.deserialize::<SharedOnly>(&xml),
        Some(SharedOnly { value: 7 })
    );
}

#[test]
fn global_subscriber_runs_alongside_failures() {
    // Another test thread may have installed it first
    let _ = logging::try_init_tracing();
    assert!(logging::try_init_tracing().is_err());
    logging::set_tracing_level(TracingLevel::Debug);
    assert_eq!(logging::current_tracing_level(), TracingLevel::Debug);

    let serializer = Serializer::new();
    assert_eq!(serializer.deserialize::<Invoice>("<Invoice><number>x"), None);
    assert!(serializer.serialize_to_string(&None::<Invoice>).is_err());
}
