//! End-to-end capture tests: probe snapshot -> indexer -> tree -> serializer.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cdp_adapter::{AdapterError, KeyChord, PageDriver};
use perceiver_structural::{
    CaptureOptions, DomProbe, DriverProbe, HighlightBox, PerceiverError, ProbeNode,
    ProbeSnapshot, Rect, StructuralPerceiver, Viewport,
};
use serde_json::Value;

fn viewport() -> Viewport {
    Viewport {
        width: 1024.0,
        height: 768.0,
        ..Default::default()
    }
}

fn visible(node: ProbeNode, y: f64) -> ProbeNode {
    node.with_rect(Rect::new(0.0, y, 200.0, 20.0))
}

/// `<div><button>Go</button><span>hi</span></div>`
fn example_page() -> ProbeSnapshot {
    let mut dom = ProbeSnapshot::new("r", viewport());
    dom.insert(visible(ProbeNode::element("r", "div"), 0.0).with_children(["a", "b"]));
    dom.insert(
        visible(ProbeNode::element("a", "button"), 0.0)
            .with_children(["ta"])
            .with_hit("a"),
    );
    dom.insert(ProbeNode::text("ta", "Go"));
    dom.insert(visible(ProbeNode::element("b", "span"), 30.0).with_children(["tb"]));
    dom.insert(ProbeNode::text("tb", "hi"));
    dom
}

/// A long list of links nested `depth` levels deep.
fn deep_page(links: usize, depth: usize) -> ProbeSnapshot {
    let mut dom = ProbeSnapshot::new("root", viewport());
    let mut parent = "root".to_string();
    dom.insert(visible(ProbeNode::element("root", "html"), 0.0));
    for level in 0..depth {
        let id = format!("d{level}");
        if let Some(node) = dom.nodes.get_mut(&parent) {
            node.children.push(id.clone());
        }
        dom.insert(visible(ProbeNode::element(id.clone(), "div"), 0.0));
        parent = id;
    }
    for i in 0..links {
        let id = format!("l{i}");
        if let Some(node) = dom.nodes.get_mut(&parent) {
            node.children.push(id.clone());
        }
        dom.insert(
            visible(ProbeNode::element(id.clone(), "a"), (i * 5) as f64)
                .with_attr("href", format!("/item/{i}"))
                .with_hit(id.clone()),
        );
    }
    dom
}

#[test]
fn example_page_serializes_to_expected_protocol() {
    let perceiver = StructuralPerceiver::default();
    let perception = perceiver
        .perceive(&example_page(), &CaptureOptions::default())
        .unwrap();
    assert_eq!(perception.clickable, "[0]<button>Go</button>\n[]hi");
    assert_eq!(perception.locators.len(), 1);
    assert_eq!(perception.locators[&0], "div/button");
}

#[test]
fn indices_are_unique_and_follow_document_order() {
    let perceiver = StructuralPerceiver::new(vec!["href".into()]);
    let perception = perceiver
        .perceive(&deep_page(120, 400), &CaptureOptions::default())
        .unwrap();

    let indices: Vec<u32> = perception.locators.keys().copied().collect();
    assert_eq!(indices, (0..120).collect::<Vec<u32>>());

    let lines: Vec<&str> = perception.clickable.lines().collect();
    assert_eq!(lines.len(), 120);
    for (i, line) in lines.iter().enumerate() {
        assert!(line.starts_with(&format!("[{i}]<a href=\"/item/{i}\">")), "{line}");
    }
}

#[test]
fn locator_keys_are_subset_of_assigned_indices() {
    let perceiver = StructuralPerceiver::default();
    let perception = perceiver
        .perceive(&deep_page(10, 3), &CaptureOptions::default())
        .unwrap();
    for (index, xpath) in &perception.locators {
        let node = perception.tree.find_by_index(*index).expect("indexed node");
        assert_eq!(&perception.tree.element(node).unwrap().xpath, xpath);
    }
    assert_eq!(perception.locators[&3], "html/div/div/div/a[4]");
}

#[derive(Default)]
struct RecordingProbe {
    painted: Mutex<Vec<u32>>,
}

#[async_trait]
impl DomProbe for RecordingProbe {
    async fn probe(&self) -> Result<ProbeSnapshot, PerceiverError> {
        Ok(example_page())
    }

    async fn paint_highlights(&self, boxes: &[HighlightBox]) -> Result<(), PerceiverError> {
        self.painted
            .lock()
            .unwrap()
            .extend(boxes.iter().map(|b| b.index));
        Ok(())
    }

    async fn remove_highlights(&self, _index: Option<u32>) -> Result<(), PerceiverError> {
        self.painted.lock().unwrap().clear();
        Ok(())
    }
}

#[tokio::test]
async fn capture_paints_highlights_when_requested() {
    let probe = RecordingProbe::default();
    let perceiver = StructuralPerceiver::default();

    let perception = perceiver
        .capture(&probe, &CaptureOptions::default())
        .await
        .unwrap();
    assert_eq!(perception.element_count(), 1);
    assert_eq!(*probe.painted.lock().unwrap(), vec![0]);

    probe.remove_highlights(None).await.unwrap();
    let quiet = CaptureOptions {
        do_highlight: false,
        ..Default::default()
    };
    perceiver.capture(&probe, &quiet).await.unwrap();
    assert!(probe.painted.lock().unwrap().is_empty());
}

/// Records every evaluated script and answers `true`.
#[derive(Default)]
struct ScriptLog {
    scripts: Mutex<Vec<String>>,
}

#[async_trait]
impl PageDriver for ScriptLog {
    async fn evaluate(&self, script: &str) -> Result<Value, AdapterError> {
        self.scripts.lock().unwrap().push(script.to_string());
        Ok(Value::Bool(true))
    }

    async fn navigate(&self, _url: &str) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn current_url(&self) -> Result<String, AdapterError> {
        Ok("about:blank".into())
    }

    async fn title(&self) -> Result<String, AdapterError> {
        Ok(String::new())
    }

    async fn screenshot_png(&self) -> Result<Vec<u8>, AdapterError> {
        Ok(Vec::new())
    }

    async fn dispatch_keys(&self, _chord: &KeyChord) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn bring_to_front(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), AdapterError> {
        Ok(())
    }
}

#[tokio::test]
async fn single_overlay_removal_targets_only_that_index() {
    let driver = Arc::new(ScriptLog::default());
    let probe = DriverProbe::new(Arc::clone(&driver));
    let boxes: Vec<HighlightBox> = (0..3)
        .map(|index| HighlightBox {
            index,
            tag: "button".into(),
            rects: vec![Rect::new(0.0, 30.0 * f64::from(index), 80.0, 20.0)],
        })
        .collect();

    probe.paint_highlights(&boxes).await.unwrap();
    probe.remove_highlights(Some(1)).await.unwrap();
    probe.remove_highlights(None).await.unwrap();

    let scripts = driver.scripts.lock().unwrap().clone();
    assert_eq!(scripts.len(), 3);
    assert!(scripts[0].contains("tabpilotIndex"));

    let single = &scripts[1];
    assert!(single.contains(r#"[data-tabpilot-index="1"]"#), "{single}");
    assert!(!single.contains("c.remove()"), "{single}");
    assert!(!single.contains(r#"data-tabpilot-index="0""#));

    assert!(scripts[2].contains("c.remove()"));
    assert!(!scripts[2].contains("data-tabpilot-index"));
}
