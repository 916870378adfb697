//! Components mounted into a `MemoryHost`: setup, batching, props updates,
//! slots, emit, provide/inject, templates and error reporting.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::executor::block_on;
use spark_runtime::component::RenderFn;
use spark_runtime::{
    create_renderer, fragment, h, inject, inject_or, next_tick, ref_value,
    register_runtime_compiler, render_slot, App, Callback, Component, MemoryHost, NodeId, Object,
    PublicInstance, RawSlots, Ref, RuntimeError, Value, VNode,
};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn mount(root: Component) -> (App<MemoryHost>, NodeId) {
    init_logging();
    let renderer = create_renderer(MemoryHost::new());
    let container = renderer.with_host_mut(|host| host.create_root("div"));
    let app = renderer.create_app(root);
    if let Err(error) = app.mount(container) {
        panic!("mount failed: {error}");
    }
    (app, container)
}

fn html(app: &App<MemoryHost>, container: NodeId) -> String {
    app.renderer().with_host(|host| host.inner_html(container))
}

fn counter(cell: &Rc<Cell<u32>>) -> impl Fn() + 'static {
    let cell = cell.clone();
    move || cell.set(cell.get() + 1)
}

#[test]
fn test_render_setup_state_and_props() {
    let child = Component::build("Greeting")
        .setup(|props, _| Object::new().with("greeting", ref_value(format!("hello {}", props.get("name")))))
        .render(|ctx| h("p", None, ctx.get("greeting").to_string()))
        .finish();
    let root = Component::build("App")
        .render(move |_| h(&child, Object::new().with("name", "world"), ()))
        .finish();

    let (app, container) = mount(root);
    assert_eq!(html(&app, container), "<p>hello world</p>");
    assert_eq!(app.renderer().instance_count(), 2);
}

#[test]
fn test_two_writes_render_once() {
    let a = ref_value(1);
    let b = ref_value(2);
    let renders = Rc::new(Cell::new(0));

    let (sa, sb) = (a.clone(), b.clone());
    let bump = counter(&renders);
    let root = Component::build("Pair")
        .setup(move |_, _| Object::new().with("a", sa.clone()).with("b", sb.clone()))
        .render(move |ctx| {
            bump();
            h("p", None, format!("{}-{}", ctx.get("a"), ctx.get("b")))
        })
        .finish();

    let (app, container) = mount(root);
    assert_eq!(renders.get(), 1);

    a.set(10);
    b.set(20);
    assert_eq!(renders.get(), 1, "updates are deferred");
    assert_eq!(html(&app, container), "<p>1-2</p>");

    block_on(next_tick());
    assert_eq!(renders.get(), 2, "two writes, one render");
    assert_eq!(html(&app, container), "<p>10-20</p>");
}

#[test]
fn test_child_rerenders_only_on_prop_change() {
    let child_renders = Rc::new(Cell::new(0));
    let bump = counter(&child_renders);
    let child = Component::build("Child")
        .render(move |ctx| {
            bump();
            h("span", None, ctx.get("msg").to_string())
        })
        .finish();

    let msg = ref_value("a");
    let other = ref_value(0);
    let (m, o) = (msg.clone(), other.clone());
    let root = Component::build("Parent")
        .setup(move |_, _| Object::new().with("msg", m.clone()).with("other", o.clone()))
        .render(move |ctx| {
            h(
                "div",
                None,
                vec![
                    h("b", None, ctx.get("other").to_string()),
                    h(&child, Object::new().with("msg", ctx.get("msg")), ()),
                ],
            )
        })
        .finish();

    let (app, container) = mount(root);
    assert_eq!(child_renders.get(), 1);

    other.set(1);
    block_on(next_tick());
    assert_eq!(html(&app, container), "<div><b>1</b><span>a</span></div>");
    assert_eq!(child_renders.get(), 1, "same props must not re-render the child");

    msg.set("b");
    block_on(next_tick());
    assert_eq!(html(&app, container), "<div><b>1</b><span>b</span></div>");
    assert_eq!(child_renders.get(), 2);
}

#[test]
fn test_provide_inject_through_intermediate() {
    let consumer = Component::build("Consumer")
        .setup(|_, ctx| {
            Object::new()
                .with("foo", ctx.inject("foo").unwrap_or_default())
                .with("missing", ctx.inject_or("missing", "fallback"))
                .with("lazy", ctx.inject_or_else("missing", || Value::from("fallbackFn")))
                .with("free", inject_or("foo", "none"))
        })
        .render(|ctx| {
            h(
                "p",
                None,
                format!("{}|{}|{}|{}", ctx.get("foo"), ctx.get("missing"), ctx.get("lazy"), ctx.get("free")),
            )
        })
        .finish();
    let middle = Component::build("Middle")
        .render(move |_| h(&consumer, None, ()))
        .finish();
    let provider = Component::build("Provider")
        .setup(|_, ctx| {
            ctx.provide("foo", "fooVal");
            Object::new()
        })
        .render(move |_| h(&middle, None, ()))
        .finish();

    let (app, container) = mount(provider);
    assert_eq!(html(&app, container), "<p>fooVal|fallback|fallbackFn|fooVal</p>");
}

#[test]
fn test_provider_cannot_inject_its_own_value() {
    let seen = Rc::new(RefCell::new(None));
    let s = seen.clone();
    let root = Component::build("Own")
        .setup(move |_, ctx| {
            ctx.provide("k", 1);
            *s.borrow_mut() = Some(inject("k"));
            Object::new()
        })
        .render(|_| h("div", None, ()))
        .finish();

    let _mounted = mount(root);
    assert_eq!(*seen.borrow(), Some(None));
}

#[test]
fn test_emit_calls_parent_handler() {
    let received = Rc::new(RefCell::new(Vec::new()));

    let child = Component::build("Button")
        .setup(|_, ctx| {
            let ctx = ctx.clone();
            Object::new().with(
                "press",
                Callback::from_fn(move |_| {
                    ctx.emit("add-foo", &[Value::from(1), Value::from(2)]);
                }),
            )
        })
        .render(|ctx| h("button", Object::new().with("onClick", ctx.get("press")), "add"))
        .finish();

    let r = received.clone();
    let root = Component::build("Parent")
        .render(move |_| {
            let r = r.clone();
            h(
                &child,
                Object::new().with(
                    "onAddFoo",
                    Callback::from_fn(move |args| r.borrow_mut().extend(args.iter().cloned())),
                ),
                (),
            )
        })
        .finish();

    let (app, container) = mount(root);
    let button = app.renderer().with_host(|host| host.children(container))[0];
    assert!(app.renderer().dispatch(button, "click", &[]));
    assert_eq!(*received.borrow(), vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn test_named_slots_with_props() {
    let card = Component::build("Card")
        .render(|ctx| {
            let slots = ctx.slots();
            let children: Vec<VNode> = [
                render_slot(&slots, "header", &Object::new()),
                render_slot(&slots, "default", &Object::new().with("text", "body")),
                render_slot(&slots, "footer", &Object::new()),
            ]
            .into_iter()
            .flatten()
            .collect();
            h("div", None, children)
        })
        .finish();
    let root = Component::build("App")
        .render(move |_| {
            h(
                &card,
                None,
                RawSlots::new()
                    .slot("header", |_| h("h1", None, "Title"))
                    .slot("default", |props| h("p", None, props.get("text").to_string())),
            )
        })
        .finish();

    let (app, container) = mount(root);
    assert_eq!(html(&app, container), "<div><h1>Title</h1><p>body</p></div>");
}

#[test]
fn test_fragment_root_grows_before_next_sibling() {
    let count = ref_value(2);
    let c = count.clone();
    let items = Component::build("Items")
        .setup(move |_, _| Object::new().with("count", c.clone()))
        .render(|ctx| {
            let n = ctx.get("count").as_i64().unwrap_or(0);
            let children = (0..n)
                .map(|i| h("li", Object::new().with("key", i), i.to_string()))
                .collect::<Vec<_>>();
            fragment(children)
        })
        .finish();
    let root = Component::build("List")
        .render(move |_| h("ul", None, vec![h(&items, None, ()), h("li", None, "z")]))
        .finish();

    let (app, container) = mount(root);
    assert_eq!(html(&app, container), "<ul><li>0</li><li>1</li><li>z</li></ul>");

    count.set(3);
    block_on(next_tick());
    assert_eq!(html(&app, container), "<ul><li>0</li><li>1</li><li>2</li><li>z</li></ul>");
}

fn counted_items(count: &Ref) -> Component {
    let c = count.clone();
    Component::build("Items")
        .setup(move |_, _| Object::new().with("count", c.clone()))
        .render(|ctx| {
            let n = ctx.get("count").as_i64().unwrap_or(0);
            fragment((0..n).map(|i| h("li", None, i.to_string())).collect())
        })
        .finish()
}

#[test]
fn test_empty_fragment_root_grows_before_next_sibling() {
    let count = ref_value(0);
    let items = counted_items(&count);
    let root = Component::build("List")
        .render(move |_| h("ul", None, vec![h(&items, None, ()), h("li", None, "z")]))
        .finish();

    let (app, container) = mount(root);
    assert_eq!(html(&app, container), "<ul><li>z</li></ul>");

    count.set(1);
    block_on(next_tick());
    assert_eq!(html(&app, container), "<ul><li>0</li><li>z</li></ul>");

    count.set(0);
    block_on(next_tick());
    count.set(2);
    block_on(next_tick());
    assert_eq!(html(&app, container), "<ul><li>0</li><li>1</li><li>z</li></ul>");
}

#[test]
fn test_empty_fragment_child_grows_on_parent_update() {
    let items = Component::build("Items")
        .render(|ctx| {
            let n = ctx.get("count").as_i64().unwrap_or(0);
            fragment((0..n).map(|i| h("li", None, i.to_string())).collect())
        })
        .finish();
    let count = ref_value(0);
    let c = count.clone();
    let root = Component::build("List")
        .setup(move |_, _| Object::new().with("count", c.clone()))
        .render(move |ctx| {
            h(
                "ul",
                None,
                vec![h(&items, Object::new().with("count", ctx.get("count")), ()), h("li", None, "z")],
            )
        })
        .finish();

    let (app, container) = mount(root);
    count.set(1);
    block_on(next_tick());
    assert_eq!(html(&app, container), "<ul><li>0</li><li>z</li></ul>");
}

#[test]
fn test_failed_child_mount_leaves_nothing_live() {
    let broken = Component::build("Broken").finish();
    let renders = Rc::new(Cell::new(0));
    let bump = counter(&renders);
    let state = ref_value(0);
    let s = state.clone();
    let root = Component::build("Host")
        .setup(move |_, _| Object::new().with("n", s.clone()))
        .render(move |ctx| {
            bump();
            h("div", None, vec![h("span", None, ctx.get("n").to_string()), h(&broken, None, ())])
        })
        .finish();

    init_logging();
    let renderer = create_renderer(MemoryHost::new());
    let container = renderer.with_host_mut(|host| host.create_root("div"));
    let app = renderer.create_app(root);
    assert!(matches!(app.mount(container), Err(RuntimeError::MissingRender { .. })));
    assert!(!app.is_mounted());
    assert_eq!(renderer.instance_count(), 0);

    state.set(1);
    block_on(next_tick());
    assert_eq!(renders.get(), 1, "the failed render effect is stopped");
    assert_eq!(renderer.instance_count(), 0);
    assert_eq!(renderer.with_host(|host| host.inner_html(container)), "");
}

#[test]
fn test_key_is_not_a_component_prop() {
    let child = Component::build("Row")
        .render(|ctx| h("p", None, format!("{}:{}", ctx.get("key").is_null(), ctx.get("label"))))
        .finish();
    let root = Component::build("Table")
        .render(move |_| h(&child, Object::new().with("key", "k1").with("label", "x"), ()))
        .finish();

    let (app, container) = mount(root);
    assert_eq!(html(&app, container), "<p>true:x</p>");
}

#[test]
fn test_unmounted_child_stops_rendering() {
    let show = ref_value(true);
    let tick = ref_value(0);
    let child_renders = Rc::new(Cell::new(0));

    let bump = counter(&child_renders);
    let t = tick.clone();
    let child = Component::build("Ticker")
        .setup(move |_, _| Object::new().with("tick", t.clone()))
        .render(move |ctx| {
            bump();
            h("span", None, ctx.get("tick").to_string())
        })
        .finish();
    let s = show.clone();
    let root = Component::build("Toggle")
        .setup(move |_, _| Object::new().with("show", s.clone()))
        .render(move |ctx| {
            let children = if ctx.get("show").as_bool().unwrap_or(false) {
                vec![h(&child, None, ())]
            } else {
                Vec::new()
            };
            h("div", None, children)
        })
        .finish();

    let (app, container) = mount(root);
    assert_eq!(app.renderer().instance_count(), 2);

    show.set(false);
    block_on(next_tick());
    assert_eq!(html(&app, container), "<div></div>");
    assert_eq!(app.renderer().instance_count(), 1);

    tick.set(1);
    block_on(next_tick());
    assert_eq!(child_renders.get(), 1, "unmounted child must not re-render");
}

fn tiny_compiler(template: &str) -> Result<RenderFn, RuntimeError> {
    let parsed = template
        .strip_prefix('<')
        .and_then(|rest| rest.split_once('>'))
        .map(|(tag, rest)| (tag.to_string(), rest.to_string()));
    let Some((tag, rest)) = parsed else {
        return Err(RuntimeError::Template { tag: String::new() });
    };
    let Some(text) = rest.strip_suffix(&format!("</{tag}>")).map(str::to_string) else {
        return Err(RuntimeError::Template { tag });
    };
    let render: RenderFn = Rc::new(move |_: &PublicInstance| h(tag.as_str(), None, text.clone()));
    Ok(render)
}

#[test]
fn test_template_compiled_by_registered_compiler() {
    register_runtime_compiler(Rc::new(tiny_compiler));
    let root = Component::build("Tpl").template("<em>compiled</em>").finish();

    let (app, container) = mount(root);
    assert_eq!(html(&app, container), "<em>compiled</em>");
}

#[test]
fn test_template_error_fails_mount() {
    register_runtime_compiler(Rc::new(tiny_compiler));
    let root = Component::build("Bad").template("<div>unterminated").finish();

    init_logging();
    let renderer = create_renderer(MemoryHost::new());
    let container = renderer.with_host_mut(|host| host.create_root("div"));
    let app = renderer.create_app(root);
    assert_eq!(
        app.mount(container),
        Err(RuntimeError::Template {
            tag: "div".to_string()
        })
    );
}

#[test]
fn test_scheduled_errors_reach_error_handler() {
    let broken = Component::build("Broken").finish();
    let show = ref_value(false);
    let s = show.clone();
    let root = Component::build("Host")
        .setup(move |_, _| Object::new().with("show", s.clone()))
        .render(move |ctx| {
            let children = if ctx.get("show").as_bool().unwrap_or(false) {
                vec![h(&broken, None, ())]
            } else {
                Vec::new()
            };
            h("div", None, children)
        })
        .finish();

    let (app, _container) = mount(root);
    let errors = Rc::new(RefCell::new(Vec::new()));
    let e = errors.clone();
    app.config_mut(|config| {
        config.error_handler = Some(Rc::new(move |error: &RuntimeError| e.borrow_mut().push(error.clone())));
    });

    show.set(true);
    block_on(next_tick());
    assert_eq!(
        *errors.borrow(),
        vec![RuntimeError::MissingRender {
            component: "Broken".to_string()
        }]
    );
}
