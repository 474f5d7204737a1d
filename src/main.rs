use bus::Bus;
use capture::{CaptureConfig, CaptureSession};
use dom::{Dom, ReadyState};
use std::error::Error;
use std::time::{Duration, Instant};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Records a short scripted session against a small demo page and prints one
/// JSON event per line.
fn main() -> Result<(), Box<dyn Error>> {
    let mut dom = Dom::new("https://demo.example.com/inbox");
    let doc = dom.document();
    let doctype = dom.create_doctype(doc, "html", "", "");
    let html = dom.create_element(doc, "html");
    let head = dom.create_element(doc, "head");
    let style = dom.create_element(doc, "style");
    let body = dom.create_element(doc, "body");
    let list = dom.create_element_with(doc, "ul", &[("class", "messages")]);
    let secret = dom.create_element_with(doc, "div", &[("class", "norecord")]);
    let frame = dom.create_element_with(doc, "iframe", &[("src", "/widgets/clock.html")]);
    dom.append_child(doc, doctype)?;
    dom.append_child(doc, html)?;
    dom.append_child(html, head)?;
    dom.append_child(head, style)?;
    dom.append_child(html, body)?;
    dom.append_child(body, list)?;
    dom.append_child(body, secret)?;
    dom.append_child(body, frame)?;
    dom.set_sheet(style, "ul.messages { margin: 0px; }")?;

    let widget = dom.create_document("https://demo.example.com/widgets/clock.html");
    let widget_html = dom.create_element(widget, "html");
    let clock = dom.create_text(widget, "12:00");
    dom.append_child(widget, widget_html)?;
    dom.append_child(widget_html, clock)?;
    dom.attach_frame(frame, widget)?;
    dom.take_records();

    let bus = Bus::new();
    let mut session = CaptureSession::new(CaptureConfig {
        frame_ready_timeout: Duration::from_millis(500),
        ..CaptureConfig::default()
    });
    session.init(bus.sender());
    session.take_full_snapshot(&dom);

    // new mail arrives, then the first one is read and moved to the end
    let mut items = Vec::new();
    for subject in ["Welcome", "Invoice", "Lunch?"] {
        let li = dom.create_element(doc, "li");
        let text = dom.create_text(doc, subject);
        dom.append_child(li, text)?;
        dom.append_child(list, li)?;
        items.push(li);
    }
    session.observe(&mut dom);

    dom.set_attribute(items[0], "class", "read")?;
    dom.append_child(list, items[0])?;
    session.observe(&mut dom);

    // the widget finishes loading
    dom.set_ready_state(widget, ReadyState::Complete)?;
    session.frame_loaded(&dom, frame);
    session.poll_frames(&dom, Instant::now());

    for event in bus.drain() {
        println!("{}", serde_json::to_string(&event)?);
    }
    let counters = session.counters();
    eprintln!(
        "{} records, {} flushes ({} empty), {} nodes tracked",
        counters.records_emitted,
        counters.flushes,
        counters.suppressed_flushes,
        session.mirror().len()
    );
    Ok(())
}
