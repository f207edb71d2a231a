//! Bundled example modules.
//!
//! Every scenario shares one prelude of actor and global actor
//! declarations and adds the functions it exercises.

use hop_ir::{Span, StringInterner};
use hop_isolation::{
    ActorDecl, BodyBuilder, ClosureDef, Convention, DeclTable, FuncDecl, GlobalActorDecl,
    IsolationAttr, Module, ParamDecl, SharedAccessor, TypeRef,
};

/// One bundled module.
pub struct Scenario {
    pub name: &'static str,
    pub summary: &'static str,
    /// Function simulated by `hopc trace`.
    pub entry: &'static str,
    /// Call site whose callee throws while tracing.
    pub throw_at: Option<u32>,
    build: fn(&StringInterner) -> Module,
}

impl Scenario {
    pub fn module(&self, interner: &StringInterner) -> Module {
        (self.build)(interner)
    }
}

/// Every scenario, in listing order.
pub fn all() -> &'static [Scenario] {
    SCENARIOS
}

pub fn find(name: &str) -> Option<&'static Scenario> {
    SCENARIOS.iter().find(|s| s.name == name)
}

static SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "global-entry",
        summary: "function on a global actor with stored `shared`",
        entry: "run",
        throw_at: None,
        build: global_entry,
    },
    Scenario {
        name: "nonisolated-to-red",
        summary: "nonisolated caller hops to a global actor and back",
        entry: "main",
        throw_at: None,
        build: nonisolated_to_red,
    },
    Scenario {
        name: "same-instance",
        summary: "actor method calling another method on `self`",
        entry: "MyActor.f",
        throw_at: None,
        build: same_instance,
    },
    Scenario {
        name: "actor-to-actor",
        summary: "throwing call into another actor instance",
        entry: "MyActor.f",
        throw_at: Some(0),
        build: actor_to_actor,
    },
    Scenario {
        name: "constructed-actor",
        summary: "call on a freshly constructed actor",
        entry: "make",
        throw_at: None,
        build: constructed_actor,
    },
    Scenario {
        name: "generic-global",
        summary: "generic global actor reached through a getter",
        entry: "run",
        throw_at: None,
        build: generic_global,
    },
    Scenario {
        name: "actor-closure",
        summary: "async closure inside an actor method",
        entry: "MyActor.f",
        throw_at: None,
        build: actor_closure,
    },
    Scenario {
        name: "to-async",
        summary: "global-actor function value converted to async",
        entry: "convert",
        throw_at: None,
        build: to_async,
    },
    Scenario {
        name: "sync-hop",
        summary: "synchronous caller that would need a hop (E4008)",
        entry: "main",
        throw_at: None,
        build: sync_hop,
    },
];

// ── Prelude ─────────────────────────────────────────────────────────

fn prelude(i: &StringInterner) -> DeclTable {
    let mut decls = DeclTable::new();
    for actor in ["MyActor", "RedActorImpl", "BlueActorImpl"] {
        decls.add_actor(ActorDecl {
            name: i.intern(actor),
            generic_params: Vec::new(),
            span: Span::DUMMY,
        });
    }
    decls.add_actor(ActorDecl {
        name: i.intern("MyGenericActor"),
        generic_params: vec![i.intern("T")],
        span: Span::DUMMY,
    });

    decls.add_global_actor(GlobalActorDecl {
        name: i.intern("GlobalActor"),
        generic_params: Vec::new(),
        instance: named(i, "MyActor"),
        shared: SharedAccessor::Stored {
            addressor: i.intern("GlobalActor.shared.unsafeMutableAddressor"),
        },
        span: Span::DUMMY,
    });
    for (actor, instance) in [("RedActor", "RedActorImpl"), ("BlueActor", "BlueActorImpl")] {
        decls.add_global_actor(GlobalActorDecl {
            name: i.intern(actor),
            generic_params: Vec::new(),
            instance: named(i, instance),
            shared: SharedAccessor::Computed {
                getter: i.intern(&format!("{actor}.shared.getter")),
            },
            span: Span::DUMMY,
        });
    }
    decls.add_global_actor(GlobalActorDecl {
        name: i.intern("GenericGlobalActorWithGetter"),
        generic_params: vec![i.intern("T")],
        instance: TypeRef::generic(i.intern("MyGenericActor"), vec![named(i, "T")]),
        shared: SharedAccessor::Computed {
            getter: i.intern("GenericGlobalActorWithGetter.shared.getter"),
        },
        span: Span::DUMMY,
    });
    decls
}

fn named(i: &StringInterner, name: &str) -> TypeRef {
    TypeRef::named(i.intern(name))
}

fn func(i: &StringInterner, name: &str) -> FuncDecl {
    FuncDecl::new(i.intern(name), Span::DUMMY)
}

fn method(i: &StringInterner, actor: &str, name: &str) -> FuncDecl {
    func(i, &format!("{actor}.{name}")).with_receiver(named(i, actor), Convention::Guaranteed)
}

fn on(i: &StringInterner, f: FuncDecl, actor: &str) -> FuncDecl {
    f.with_attr(IsolationAttr::GlobalActor(named(i, actor)), Span::DUMMY)
}

// ── Scenarios ───────────────────────────────────────────────────────

fn global_entry(i: &StringInterner) -> Module {
    let mut decls = prelude(i);
    let run = on(i, func(i, "run"), "GlobalActor").with_async();
    let name = run.name;
    decls.add_function(run);
    Module::new(decls).with_body(name, BodyBuilder::new().finish())
}

fn nonisolated_to_red(i: &StringInterner) -> Module {
    let mut decls = prelude(i);
    let red = on(i, func(i, "red"), "RedActor").with_async();
    let main = func(i, "main")
        .with_attr(IsolationAttr::Nonisolated, Span::DUMMY)
        .with_async();

    let mut body = BodyBuilder::new();
    let call = body.call(red.name, vec![]);
    body.expr_stmt(call);

    let main_name = main.name;
    decls.add_function(red);
    decls.add_function(main);
    Module::new(decls).with_body(main_name, body.finish())
}

fn same_instance(i: &StringInterner) -> Module {
    let mut decls = prelude(i);
    let g = method(i, "MyActor", "g").with_async();
    let f = method(i, "MyActor", "f").with_async();

    let mut body = BodyBuilder::new();
    let this = body.self_ref();
    let call = body.method_call(this, g.name, vec![]);
    body.expr_stmt(call);

    let f_name = f.name;
    decls.add_function(g);
    decls.add_function(f);
    Module::new(decls).with_body(f_name, body.finish())
}

fn actor_to_actor(i: &StringInterner) -> Module {
    let mut decls = prelude(i);
    let g = method(i, "MyActor", "g").with_async().with_throws();
    let f = method(i, "MyActor", "f")
        .with_param(ParamDecl::new(i.intern("other"), named(i, "MyActor")))
        .with_async()
        .with_throws();

    let mut body = BodyBuilder::new();
    let other = body.param(0);
    let call = body.method_call(other, g.name, vec![]);
    body.expr_stmt(call);

    let f_name = f.name;
    decls.add_function(g);
    decls.add_function(f);
    Module::new(decls).with_body(f_name, body.finish())
}

fn constructed_actor(i: &StringInterner) -> Module {
    let mut decls = prelude(i);
    let g = method(i, "MyActor", "g").with_async();
    let make = on(i, func(i, "make"), "RedActor").with_async();

    let mut body = BodyBuilder::new();
    let fresh = body.construct(named(i, "MyActor"), vec![]);
    let local = body.bind(fresh);
    let receiver = body.local(local);
    let call = body.method_call(receiver, g.name, vec![]);
    body.expr_stmt(call);

    let make_name = make.name;
    decls.add_function(g);
    decls.add_function(make);
    Module::new(decls).with_body(make_name, body.finish())
}

fn generic_global(i: &StringInterner) -> Module {
    let mut decls = prelude(i);
    let actor = TypeRef::generic(i.intern("GenericGlobalActorWithGetter"), vec![named(i, "Int")]);
    let run = func(i, "run")
        .with_attr(IsolationAttr::GlobalActor(actor), Span::DUMMY)
        .with_async();
    let name = run.name;
    decls.add_function(run);
    Module::new(decls).with_body(name, BodyBuilder::new().finish())
}

fn actor_closure(i: &StringInterner) -> Module {
    let mut decls = prelude(i);
    let red = on(i, func(i, "red"), "RedActor").with_async();
    let f = method(i, "MyActor", "f").with_async();

    let mut inner = BodyBuilder::starting_at(100);
    let call = inner.call(red.name, vec![]);
    inner.expr_stmt(call);

    let mut body = BodyBuilder::new();
    let closure = body.closure(ClosureDef::new(inner.finish()).with_async());
    body.bind(closure);

    let f_name = f.name;
    decls.add_function(red);
    decls.add_function(f);
    Module::new(decls).with_body(f_name, body.finish())
}

fn to_async(i: &StringInterner) -> Module {
    let mut decls = prelude(i);
    let convert = func(i, "convert")
        .with_param(ParamDecl::new(i.intern("f"), named(i, "Fn")))
        .with_async();

    let mut body = BodyBuilder::new();
    let value = body.param(0);
    let converted = body.to_async(value, named(i, "RedActor"), vec![named(i, "Int")], Some(named(i, "Int")));
    body.bind(converted);

    let name = convert.name;
    decls.add_function(convert);
    Module::new(decls).with_body(name, body.finish())
}

fn sync_hop(i: &StringInterner) -> Module {
    let mut decls = prelude(i);
    let red = on(i, func(i, "red"), "RedActor");
    let main = func(i, "main");

    let mut body = BodyBuilder::new();
    let call = body.call(red.name, vec![]);
    body.expr_stmt(call);

    let main_name = main.name;
    decls.add_function(red);
    decls.add_function(main);
    Module::new(decls).with_body(main_name, body.finish())
}
