//! The channel between the host page and the embedded widget.
//!
//! Inbound, the bridge admits a message only if the [`OriginPolicy`]
//! trusts its origin, applies `resize` requests to the transport directly
//! and hands every recognised message back to the caller for lifecycle
//! bookkeeping. Outbound, it serializes [`Outbound`] messages and delivers
//! them to whichever [`Transport`] is attached, always restricted to the
//! trusted origin.

use std::fmt::Debug;

use serde_json::Value;
use tracing::{debug, trace};

use crate::{
    COLLAPSED_SIZE, Dimension, Host, Inbound, OriginPolicy, Outbound, PANEL_RADIUS, PILL_RADIUS,
    ParleyEmbedError, Transport,
};

/// Border radius for a transport that is `width` wide: the circular pill
/// at exactly the collapsed size, the panel radius otherwise
pub fn border_radius_for(width: &Dimension) -> &'static str {
    if width.as_pixels() == Some(COLLAPSED_SIZE) {
        PILL_RADIUS
    } else {
        PANEL_RADIUS
    }
}

/// Bidirectional message channel for one embed instance
#[derive(Debug)]
pub struct MessageBridge<N> {
    policy: OriginPolicy,
    transport: Option<Transport<N>>,
}

impl<N> MessageBridge<N>
where
    N: Clone + PartialEq + Debug,
{
    /// A bridge with no transport attached yet
    pub fn new(policy: OriginPolicy) -> Self {
        Self {
            policy,
            transport: None,
        }
    }

    /// The origin policy applied to inbound messages
    pub fn policy(&self) -> &OriginPolicy {
        &self.policy
    }

    /// Connect the bridge to the transport once it is in the document
    pub fn attach(&mut self, transport: Transport<N>) {
        self.transport = Some(transport);
    }

    /// The attached transport, if any
    pub fn transport(&self) -> Option<&Transport<N>> {
        self.transport.as_ref()
    }

    /// Admit and interpret an inbound message.
    ///
    /// Returns `None` when the origin is untrusted or the message type is
    /// unknown. `resize` messages are applied to the transport before being
    /// returned.
    pub fn receive<H>(&self, host: &mut H, origin: &str, data: &Value) -> Option<Inbound>
    where
        H: Host<Node = N>,
    {
        if !self.policy.admit(origin) {
            return None;
        }

        let Some(message) = Inbound::parse(data) else {
            trace!(%data, "Ignoring unrecognised widget message");
            return None;
        };

        if let Inbound::Resize { width, height } = &message {
            self.resize(host, width.as_ref(), height.as_ref());
        }

        Some(message)
    }

    /// Deliver `message` to the transport. Without a transport this is a
    /// no-op.
    pub fn send<H>(&self, host: &mut H, message: &Outbound) -> Result<(), ParleyEmbedError>
    where
        H: Host<Node = N>,
    {
        let Some(transport) = &self.transport else {
            debug!(?message, "No widget transport; dropping message");
            return Ok(());
        };

        let encoded = message.to_json()?;

        match transport {
            Transport::Frame(frame) => {
                host.post_to_frame(frame, &encoded, self.policy.trusted_origin())
            }
            Transport::Component(element) => host.post_to_element(element, &encoded),
        }
    }

    fn resize<H>(&self, host: &mut H, width: Option<&Dimension>, height: Option<&Dimension>)
    where
        H: Host<Node = N>,
    {
        let Some(transport) = &self.transport else {
            return;
        };
        let node = transport.node();

        if let Some(width) = width {
            host.set_style(node, "width", &width.to_css());
            host.set_style(node, "border-radius", border_radius_for(width));
        }

        if let Some(height) = height {
            host.set_style(node, "height", &height.to_css());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryHost, MemoryNode, host::Delivery};
    use serde_json::json;
    use testresult::TestResult;

    const TRUSTED: &str = "https://widget.parley.chat";

    fn bridge_with_frame(
        host: &mut MemoryHost,
    ) -> Result<MessageBridge<MemoryNode>, ParleyEmbedError> {
        let frame = host.create_element("iframe")?;
        host.append_to_body(&frame)?;

        let mut bridge = MessageBridge::new(OriginPolicy::new(TRUSTED, Vec::<String>::new()));
        bridge.attach(Transport::Frame(frame));
        Ok(bridge)
    }

    #[test]
    fn it_uses_the_pill_radius_only_at_the_collapsed_width() {
        assert_eq!(border_radius_for(&Dimension::Pixels(COLLAPSED_SIZE)), PILL_RADIUS);
        assert_eq!(border_radius_for(&Dimension::from("60px")), PILL_RADIUS);
        assert_eq!(
            border_radius_for(&Dimension::Pixels(COLLAPSED_SIZE - 1.0)),
            PANEL_RADIUS
        );
        assert_eq!(
            border_radius_for(&Dimension::Pixels(COLLAPSED_SIZE + 1.0)),
            PANEL_RADIUS
        );
        assert_eq!(border_radius_for(&Dimension::from("100%")), PANEL_RADIUS);
    }

    #[test]
    fn it_resizes_the_transport() -> TestResult {
        let mut host = MemoryHost::default();
        let bridge = bridge_with_frame(&mut host)?;
        let frame = *bridge.transport().ok_or("no transport")?.node();

        let received = bridge.receive(
            &mut host,
            TRUSTED,
            &json!({ "type": "resize", "payload": { "width": 380, "height": "600" } }),
        );

        assert!(matches!(received, Some(Inbound::Resize { .. })));
        let element = host.element(&frame).ok_or("no frame")?;
        assert_eq!(element.style("width"), Some("380px"));
        assert_eq!(element.style("height"), Some("600px"));
        assert_eq!(element.style("border-radius"), Some(PANEL_RADIUS));
        Ok(())
    }

    #[test]
    fn it_drops_messages_from_untrusted_origins() -> TestResult {
        let mut host = MemoryHost::default();
        let bridge = bridge_with_frame(&mut host)?;
        let before = host.mutations();

        let received = bridge.receive(
            &mut host,
            "https://evil.example",
            &json!({ "type": "resize", "width": 900, "height": 900 }),
        );

        assert_eq!(received, None);
        assert_eq!(host.mutations(), before);
        Ok(())
    }

    #[test]
    fn it_posts_to_the_trusted_origin_only() -> TestResult {
        let mut host = MemoryHost::default();
        let bridge = bridge_with_frame(&mut host)?;

        bridge.send(&mut host, &Outbound::Open)?;

        let posted = host.posted();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].message, json!({ "type": "open" }));
        assert_eq!(
            posted[0].delivery,
            Delivery::Frame {
                target_origin: TRUSTED.into()
            }
        );
        Ok(())
    }

    #[test]
    fn it_sends_nothing_without_a_transport() -> TestResult {
        let mut host = MemoryHost::default();
        let bridge = MessageBridge::<MemoryNode>::new(OriginPolicy::new(TRUSTED, ["x"]));

        bridge.send(&mut host, &Outbound::Toggle)?;

        assert!(host.posted().is_empty());
        Ok(())
    }
}
