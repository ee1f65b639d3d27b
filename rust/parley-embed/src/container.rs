//! The single mount point the widget lives in.
//!
//! There is at most one container per page, identified by
//! [`CONTAINER_ID`]. Preparing a container always removes any existing one
//! first, so a re-`init` never inherits stale children or listeners.

use tracing::{debug, warn};

use crate::{CONTAINER_ID, Host};

/// Replace any existing container with a fresh, empty one appended to
/// `document.body`.
///
/// Returns `None` (after logging) when the page has no body yet; the caller
/// is expected to initialize after the DOM is ready.
pub fn ensure_container<H: Host>(host: &mut H, class_name: Option<&str>) -> Option<H::Node> {
    remove_existing(host);

    if !host.has_body() {
        warn!("document.body is not available; call init after the DOM is ready");
        return None;
    }

    let container = match host.create_element("div") {
        Ok(container) => container,
        Err(error) => {
            warn!("Could not create the widget container: {error}");
            return None;
        }
    };

    host.set_attribute(&container, "id", CONTAINER_ID);

    if let Some(class_name) = class_name.filter(|class_name| !class_name.trim().is_empty()) {
        host.set_attribute(&container, "class", class_name);
    }

    if let Err(error) = host.append_to_body(&container) {
        warn!("Could not mount the widget container: {error}");
        return None;
    }

    debug!("Mounted widget container");
    Some(container)
}

/// Remove the container (and with it the transport) from the page
pub fn remove_container<H: Host>(host: &mut H, container: &H::Node) {
    host.remove(container);
    // A container left behind by an earlier loader copy shares the id
    remove_existing(host);
}

fn remove_existing<H: Host>(host: &mut H) {
    while let Some(existing) = host.find_by_id(CONTAINER_ID) {
        debug!("Removing existing widget container");
        host.remove(&existing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryHost;
    use testresult::TestResult;

    #[test]
    fn it_replaces_rather_than_reuses_an_existing_container() -> TestResult {
        let mut host = MemoryHost::default();

        let first = ensure_container(&mut host, None).ok_or("no container")?;
        let second = ensure_container(&mut host, Some("brand")).ok_or("no container")?;

        assert_ne!(first, second);
        assert!(!host.is_attached(&first));
        assert_eq!(host.count_by_id(CONTAINER_ID), 1);
        assert_eq!(
            host.element(&second).and_then(|e| e.attribute("class").map(String::from)),
            Some("brand".into())
        );
        Ok(())
    }

    #[test]
    fn it_gives_up_quietly_without_a_body() {
        let mut host = MemoryHost::default().without_body();

        assert_eq!(ensure_container(&mut host, None), None);
        assert_eq!(host.mutations(), 0);
    }

    #[test]
    fn it_removes_the_container() -> TestResult {
        let mut host = MemoryHost::default();
        let container = ensure_container(&mut host, None).ok_or("no container")?;

        remove_container(&mut host, &container);

        assert_eq!(host.count_by_id(CONTAINER_ID), 0);
        assert!(host.body_children().is_empty());
        Ok(())
    }
}
