//! End-to-end behavior of the widget against an in-memory page.

use parley_embed::{
    CONTAINER_ID, Host, MemoryHost, PANEL_RADIUS, PILL_RADIUS, PartialConfig, State,
    Transport, Visibility, WIDGET_ELEMENT, Widget, host::Delivery,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::{cell::Cell, rc::Rc};
use testresult::TestResult;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen_test::wasm_bindgen_test;

const TRUSTED: &str = "https://widget.parley.chat";

fn options(value: Value) -> PartialConfig {
    PartialConfig::from_value(value)
}

fn ready(widget: &Widget<MemoryHost>) {
    widget.deliver(TRUSTED, json!({ "type": "ready" }));
}

fn transport(widget: &Widget<MemoryHost>) -> Option<Transport<parley_embed::MemoryNode>> {
    widget.inspect(|loader| loader.transport().cloned()).flatten()
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), test_log::test)]
fn it_keeps_a_single_container_across_repeated_init() {
    let host = MemoryHost::default();
    let widget = Widget::new(host.clone());

    widget
        .init(options(json!({ "widgetId": "one" })))
        .init(options(json!({ "widgetId": "two" })));

    assert_eq!(host.count_by_id(CONTAINER_ID), 1);
    assert_eq!(host.body_children().len(), 1);
    assert_eq!(
        widget.inspect(|loader| loader.config().map(|config| config.widget_id.clone())),
        Some(Some("two".to_string()))
    );
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), test_log::test)]
fn it_switches_to_the_pill_radius_only_at_the_collapsed_width() -> TestResult {
    let host = MemoryHost::default();
    let widget = Widget::new(host.clone());
    widget.init(PartialConfig::default());
    let frame = *transport(&widget).ok_or("no transport")?.node();

    for (width, radius) in [
        (json!(59), PANEL_RADIUS),
        (json!(60), PILL_RADIUS),
        (json!(61), PANEL_RADIUS),
        (json!("60px"), PILL_RADIUS),
        (json!(380), PANEL_RADIUS),
    ] {
        widget.deliver(
            TRUSTED,
            json!({ "type": "resize", "payload": { "width": width, "height": 600 } }),
        );

        let element = host.element(&frame).ok_or("missing frame")?;
        assert_eq!(element.style("border-radius"), Some(radius), "width {width}");
        assert_eq!(element.style("height"), Some("600px"));
    }

    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), test_log::test)]
fn it_leaves_the_radius_alone_when_a_resize_omits_the_width() -> TestResult {
    let host = MemoryHost::default();
    let widget = Widget::new(host.clone());
    widget.init(PartialConfig::default());
    let frame = *transport(&widget).ok_or("no transport")?.node();

    widget.deliver(TRUSTED, json!({ "type": "resize", "height": "80vh" }));

    let element = host.element(&frame).ok_or("missing frame")?;
    assert_eq!(element.style("height"), Some("80vh"));
    assert_eq!(element.style("border-radius"), Some(PILL_RADIUS));
    assert_eq!(element.style("width"), Some("60px"));
    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), test_log::test)]
fn it_fires_on_load_exactly_once() {
    let widget = Widget::new(MemoryHost::default());
    let fired = Rc::new(Cell::new(0));
    let counter = fired.clone();

    widget.init_with(PartialConfig::default(), move || counter.set(counter.get() + 1));

    widget
        .deliver(TRUSTED, json!({ "type": "loaded" }))
        .deliver(TRUSTED, json!({ "type": "ready" }))
        .deliver(TRUSTED, json!({ "type": "ready" }));

    assert_eq!(fired.get(), 1);
    assert_eq!(widget.state(), State::Ready(Visibility::Closed));
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), test_log::test)]
fn it_replays_queued_commands_in_issue_order() {
    let host = MemoryHost::default();
    let widget = Widget::new(host.clone());

    widget
        .init(PartialConfig::default())
        .open()
        .send_message("a")
        .send_message("b");

    assert!(host.posted().is_empty());
    assert_eq!(widget.inspect(|loader| loader.queued()), Some(3));

    ready(&widget);

    assert_eq!(
        host.posted_messages(),
        vec![
            json!({ "type": "open" }),
            json!({ "type": "message", "payload": { "text": "a" } }),
            json!({ "type": "message", "payload": { "text": "b" } }),
        ]
    );
    assert_eq!(widget.inspect(|loader| loader.queued()), Some(0));
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), test_log::test)]
fn it_ignores_every_message_from_untrusted_origins() {
    let host = MemoryHost::default();
    let widget = Widget::new(host.clone());
    widget.init(PartialConfig::default()).toggle();
    let mutations = host.mutations();

    for origin in [
        "https://evil.example",
        "http://widget.parley.chat",
        "https://widget.parley.chat.evil.example",
        "null",
        "",
    ] {
        for message in [
            json!({ "type": "ready" }),
            json!({ "type": "loaded" }),
            json!({ "type": "open" }),
            json!({ "type": "resize", "width": 400, "height": 600 }),
        ] {
            widget.deliver(origin, message);
        }
    }

    assert_eq!(widget.state(), State::Mounting);
    assert_eq!(host.mutations(), mutations);
    assert!(host.posted().is_empty());
    assert_eq!(widget.inspect(|loader| loader.queued()), Some(1));
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), test_log::test)]
fn it_also_trusts_allow_listed_origins() {
    let host = MemoryHost::default();
    let widget = Widget::new(host.clone());

    widget.init(options(json!({
        "allowedOrigins": ["https://chat.customer.example/"]
    })));
    widget.deliver("https://chat.customer.example", json!({ "type": "ready" }));
    assert!(widget.state().is_ready());

    widget.open();
    assert_eq!(
        host.posted()[0].delivery,
        Delivery::Frame {
            target_origin: TRUSTED.into()
        }
    );
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), test_log::test)]
fn it_does_nothing_after_destroy() {
    let host = MemoryHost::default();
    let widget = Widget::new(host.clone());
    widget.init(PartialConfig::default()).open();
    ready(&widget);

    widget.destroy();
    let mutations = host.mutations();
    let posted = host.posted().len();

    widget
        .open()
        .close()
        .toggle()
        .send_message("anyone there?")
        .destroy();
    ready(&widget);
    widget.deliver(TRUSTED, json!({ "type": "resize", "width": 400 }));

    assert_eq!(widget.state(), State::Destroyed);
    assert_eq!(host.mutations(), mutations);
    assert_eq!(host.posted().len(), posted);
    assert!(!host.is_listening());
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), test_log::test)]
fn it_drops_commands_queued_before_destroy() {
    let host = MemoryHost::default();
    let widget = Widget::new(host.clone());

    widget
        .init(PartialConfig::default())
        .open()
        .send_message("lost")
        .destroy()
        .init(PartialConfig::default());
    ready(&widget);

    assert!(host.posted().is_empty());
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), test_log::test)]
fn it_ignores_commands_before_init() {
    let host = MemoryHost::default();
    let widget = Widget::new(host.clone());

    widget.open().send_message("too early").toggle();
    widget.init(PartialConfig::default());
    ready(&widget);

    assert_eq!(widget.state(), State::Ready(Visibility::Closed));
    assert!(host.posted().is_empty());
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), test_log::test)]
fn it_embeds_a_top_left_iframe_and_opens_on_request() -> TestResult {
    let host = MemoryHost::default();
    let widget = Widget::new(host.clone());

    widget.init(options(json!({
        "widgetId": "demo",
        "position": "top-left",
        "autoOpen": true
    })));

    let container = host.find_by_id(CONTAINER_ID).ok_or("no container")?;
    let container = host.element(&container).ok_or("missing container")?;
    assert_eq!(container.children.len(), 1);

    let frame = *transport(&widget).ok_or("no transport")?.node();
    assert_eq!(container.children[0], frame);

    let element = host.element(&frame).ok_or("missing frame")?;
    assert_eq!(element.tag, "iframe");
    assert_eq!(element.style("top"), Some("20px"));
    assert_eq!(element.style("left"), Some("20px"));
    assert_eq!(element.style("bottom"), None);
    assert_eq!(element.style("right"), None);
    assert_eq!(
        element.attribute("src"),
        Some("https://widget.parley.chat/embed/demo?theme=system&position=top-left&autoOpen=true")
    );

    ready(&widget);
    assert!(host.posted().is_empty());

    widget.open();

    let posted = host.posted();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].target, frame);
    assert_eq!(posted[0].message, json!({ "type": "open" }));
    assert_eq!(
        posted[0].delivery,
        Delivery::Frame {
            target_origin: TRUSTED.into()
        }
    );
    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), test_log::test)]
fn it_falls_back_to_an_iframe_without_custom_elements() {
    let host = MemoryHost::default().without_web_components();
    let widget = Widget::new(host.clone());

    widget.init(options(json!({ "embedType": "web-component" })));

    assert!(matches!(transport(&widget), Some(Transport::Frame(_))));
    assert!(host.injected_scripts().is_empty());
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), test_log::test)]
fn it_drives_the_custom_element_through_events() -> TestResult {
    let host = MemoryHost::default();
    let widget = Widget::new(host.clone());

    widget
        .init(options(json!({ "embedType": "web-component", "widgetId": "demo" })))
        .send_message("hi");
    assert!(transport(&widget).is_none());

    let generation = host.finish_script(WIDGET_ELEMENT).ok_or("no script pending")?;
    widget.script_loaded(generation);

    let element = *transport(&widget).ok_or("element not attached")?.node();
    assert!(host.is_attached(&element));

    ready(&widget);

    let posted = host.posted();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].target, element);
    assert_eq!(posted[0].delivery, Delivery::Element);
    assert_eq!(
        posted[0].message,
        json!({ "type": "message", "payload": { "text": "hi" } })
    );
    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), test_log::test)]
fn it_injects_the_element_script_once_per_page() -> TestResult {
    let host = MemoryHost::default();
    let widget = Widget::new(host.clone());
    let web_component = json!({ "embedType": "web-component" });

    widget
        .init(options(web_component.clone()))
        .init(options(web_component.clone()));
    assert_eq!(host.injected_scripts().len(), 1);

    let generation = host.finish_script(WIDGET_ELEMENT).ok_or("no script pending")?;
    widget.script_loaded(generation);

    widget.init(options(web_component));
    assert_eq!(host.injected_scripts().len(), 1);
    assert!(matches!(transport(&widget), Some(Transport::Component(_))));
    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), test_log::test)]
fn it_ignores_a_script_load_that_outlived_its_instance() -> TestResult {
    let host = MemoryHost::default();
    let widget = Widget::new(host.clone());

    widget
        .init(options(json!({ "embedType": "web-component" })))
        .destroy();
    let mutations = host.mutations();

    let generation = host.finish_script(WIDGET_ELEMENT).ok_or("no script pending")?;
    widget.script_loaded(generation);

    assert_eq!(widget.state(), State::Destroyed);
    assert_eq!(host.mutations(), mutations);
    assert_eq!(host.count_by_id(CONTAINER_ID), 0);
    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), test_log::test)]
fn it_runs_commands_immediately_once_ready() {
    let host = MemoryHost::default();
    let widget = Widget::new(host.clone());
    widget.init(PartialConfig::default());
    ready(&widget);

    widget.toggle();
    assert_eq!(host.posted().len(), 1);

    widget.close();
    assert_eq!(
        host.posted_messages(),
        vec![json!({ "type": "toggle" }), json!({ "type": "close" })]
    );
}
