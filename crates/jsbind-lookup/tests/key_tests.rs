use super::*;
use crate::raw::{
    ArrayData, CompoundName, FieldData, LocalData, MethodData, PackageData, ReferenceData,
    TypeFlags,
};
use jsbind_common::Modifiers;
use smallvec::smallvec;
use std::sync::Arc;

fn reference(store: &mut BindingStore, names: &[&str], enclosing: BindingId) -> BindingId {
    let compound_name: CompoundName = names.iter().map(|s| Arc::from(*s)).collect();
    let source_name: Arc<str> = Arc::from(*names.last().expect("name"));
    let flags = if enclosing.is_some() {
        TypeFlags::MEMBER
    } else {
        TypeFlags::empty()
    };
    store.alloc(RawBinding::Reference(ReferenceData {
        constant_pool_name: Some(Arc::from(names.join("/"))),
        compound_name,
        source_name,
        modifiers: Modifiers::PUBLIC,
        flags,
        enclosing,
        package: BindingId::NONE,
        superclass: BindingId::NONE,
        fields: Vec::new(),
        methods: Vec::new(),
        member_types: Vec::new(),
        file_name: None,
        problem: None,
        closest_match: BindingId::NONE,
    }))
}

#[test]
fn test_type_and_array_keys() {
    let mut store = BindingStore::new();
    let foo = reference(&mut store, &["p", "q", "Foo"], BindingId::NONE);
    let array = store.alloc(RawBinding::Array(ArrayData {
        leaf: foo,
        dimensions: 2,
    }));
    let int = store.alloc(RawBinding::Base(BaseType::Int));
    assert_eq!(unique_key(&store, foo), "Lp/q/Foo;");
    assert_eq!(unique_key(&store, array), "[[Lp/q/Foo;");
    assert_eq!(unique_key(&store, int), "I");
    assert_eq!(unique_key(&store, BindingId::NONE), "");
}

#[test]
fn test_member_type_key_uses_enclosing() {
    let mut store = BindingStore::new();
    let outer = reference(&mut store, &["p", "Outer"], BindingId::NONE);
    let inner = store.alloc(RawBinding::Reference(ReferenceData {
        compound_name: smallvec![Arc::from("p"), Arc::from("Outer$Inner")],
        source_name: Arc::from("Inner"),
        constant_pool_name: Some(Arc::from("p/Outer$Inner")),
        modifiers: Modifiers::empty(),
        flags: TypeFlags::MEMBER,
        enclosing: outer,
        package: BindingId::NONE,
        superclass: BindingId::NONE,
        fields: Vec::new(),
        methods: Vec::new(),
        member_types: Vec::new(),
        file_name: None,
        problem: None,
        closest_match: BindingId::NONE,
    }));
    assert_eq!(unique_key(&store, inner), "Lp/Outer$Inner;");
}

#[test]
fn test_member_keys() {
    let mut store = BindingStore::new();
    let foo = reference(&mut store, &["p", "Foo"], BindingId::NONE);
    let int = store.alloc(RawBinding::Base(BaseType::Int));
    let void = store.alloc(RawBinding::Base(BaseType::Void));
    let method = store.alloc(RawBinding::Method(MethodData {
        selector: Arc::from("bar"),
        return_type: void,
        parameters: smallvec![int, foo],
        declaring_class: foo,
        modifiers: Modifiers::PUBLIC,
        locals: Vec::new(),
        problem: None,
        closest_match: BindingId::NONE,
    }));
    let field = store.alloc(RawBinding::Field(FieldData {
        name: Arc::from("count"),
        ty: int,
        modifiers: Modifiers::empty(),
        declaring_class: foo,
        id: 0,
        constant: None,
        problem: None,
        closest_match: BindingId::NONE,
    }));
    let local = store.alloc(RawBinding::Variable(LocalData {
        name: Arc::from("x"),
        ty: int,
        modifiers: Modifiers::empty(),
        id: 3,
        declaring_method: method,
        is_parameter: false,
        constant: None,
    }));
    let package = store.alloc(RawBinding::Package(PackageData {
        compound_name: smallvec![Arc::from("p"), Arc::from("q")],
        problem: None,
    }));
    assert_eq!(unique_key(&store, method), "Lp/Foo;.bar(ILp/Foo;)V");
    assert_eq!(unique_key(&store, field), "Lp/Foo;.count)I");
    assert_eq!(unique_key(&store, local), "Lp/Foo;.bar(ILp/Foo;)V#x#3");
    assert_eq!(unique_key(&store, package), "p/q");
}

#[test]
fn test_parse_type_keys() {
    assert_eq!(KeyDescriptor::parse("I"), Ok(KeyDescriptor::Base(BaseType::Int)));
    let parsed = KeyDescriptor::parse("[[Lp/Foo;").expect("array key");
    let KeyDescriptor::Array { dimensions, leaf } = &parsed else {
        panic!("expected array, got {parsed:?}");
    };
    assert_eq!(*dimensions, 2);
    assert_eq!(
        **leaf,
        KeyDescriptor::Type {
            compound_name: vec!["p".into(), "Foo".into()]
        }
    );
    assert_eq!(parsed.type_name(), None);
}

#[test]
fn test_parse_member_keys() {
    let method = KeyDescriptor::parse("Lp/Foo;.bar(ILp/Foo;)V").expect("method key");
    let KeyDescriptor::Method {
        selector,
        parameters,
        return_type,
        ..
    } = &method
    else {
        panic!("expected method, got {method:?}");
    };
    assert_eq!(selector, "bar");
    assert_eq!(parameters.len(), 2);
    assert_eq!(return_type.as_deref(), Some(&KeyDescriptor::Base(BaseType::Void)));
    assert_eq!(method.type_name(), Some(&["p".to_string(), "Foo".to_string()][..]));

    let field = KeyDescriptor::parse("Lp/Foo;.count)I").expect("field key");
    assert!(matches!(field, KeyDescriptor::Field { ref name, .. } if name == "count"));

    let local = KeyDescriptor::parse("Lp/Foo;.bar()V#x#3").expect("local key");
    let KeyDescriptor::Local { name, id, method } = &local else {
        panic!("expected local, got {local:?}");
    };
    assert_eq!((name.as_str(), *id), ("x", 3));
    assert!(matches!(**method, KeyDescriptor::Method { .. }));
    assert_eq!(local.type_name(), Some(&["p".to_string(), "Foo".to_string()][..]));
}

#[test]
fn test_parse_package_keys() {
    assert_eq!(
        KeyDescriptor::parse("p/q"),
        Ok(KeyDescriptor::Package {
            compound_name: vec!["p".into(), "q".into()]
        })
    );
    assert!(matches!(
        KeyDescriptor::parse("Lib"),
        Ok(KeyDescriptor::Package { .. })
    ));
}

#[test]
fn test_parse_rejects_malformed_keys() {
    for bad in ["", "[Lp/Foo", "Lp/Foo;x", "Lp/Foo;.bar(I", "Lp/Foo;.bar()V#x#y", "p//q"] {
        let err = KeyDescriptor::parse(bad).expect_err(bad);
        assert_eq!(err.key, bad);
    }
}
