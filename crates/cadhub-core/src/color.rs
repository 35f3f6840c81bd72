//! Body color collaborator

use cadhub_automation::{AutomationResult, BodyHandle, CadAutomation, Color, DocumentHandle};

/// Reads and applies the color of a part body
pub trait ColorService {
    /// Defined when either the real or the visible color is defined
    fn get_color(
        &self,
        cad: &dyn CadAutomation,
        document: DocumentHandle,
        body: BodyHandle,
    ) -> AutomationResult<Option<Color>>;

    fn apply_color(
        &self,
        cad: &mut dyn CadAutomation,
        document: DocumentHandle,
        body: BodyHandle,
        color: Color,
    ) -> AutomationResult<()>;
}

/// Color service over the body's graphic properties
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyColorService;

impl ColorService for PropertyColorService {
    fn get_color(
        &self,
        cad: &dyn CadAutomation,
        document: DocumentHandle,
        body: BodyHandle,
    ) -> AutomationResult<Option<Color>> {
        let properties = cad.body_colors(document, body)?;
        Ok(properties.real.or(properties.visible))
    }

    fn apply_color(
        &self,
        cad: &mut dyn CadAutomation,
        document: DocumentHandle,
        body: BodyHandle,
        color: Color,
    ) -> AutomationResult<()> {
        tracing::debug!("Applying color {} to body {:?}", color, body);
        cad.set_body_color(document, body, color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadhub_automation::MemorySession;

    fn part() -> (MemorySession, DocumentHandle, BodyHandle) {
        let mut session = MemorySession::new();
        let document = session.add_document("Tank.CATPart", "/work");
        let root = session.root_of(document).unwrap();
        let body = session.main_body(root).unwrap().unwrap();
        (session, document, body)
    }

    #[test]
    fn test_undefined_color() {
        let (session, document, body) = part();
        let color = PropertyColorService.get_color(&session, document, body).unwrap();
        assert_eq!(color, None);
    }

    #[test]
    fn test_visible_color_is_fallback() {
        let (mut session, document, body) = part();
        let visible = Color::new(10, 20, 30);
        session
            .products
            .values_mut()
            .filter_map(|p| p.body.as_mut())
            .for_each(|b| b.visible = Some(visible));
        let color = PropertyColorService.get_color(&session, document, body).unwrap();
        assert_eq!(color, Some(visible));
    }

    #[test]
    fn test_apply_then_read_back() {
        let (mut session, document, body) = part();
        let red = Color::new(255, 0, 0);
        PropertyColorService
            .apply_color(&mut session, document, body, red)
            .unwrap();
        let color = PropertyColorService.get_color(&session, document, body).unwrap();
        assert_eq!(color, Some(red));
    }
}
