//! Fixed assistant texts. All user-facing strings are Spanish.

/// Role instruction sent as the system message on every provider call.
pub const DEFAULT_SYSTEM_PROMPT: &str = "Eres un asistente de ventas para una tienda de ecommerce. \
Tu tarea es ayudar a los clientes a encontrar productos, responder preguntas sobre productos y \
proporcionar recomendaciones. Sé amable, profesional y conciso en tus respuestas.";

/// Shown when the provider fails. Never cached.
pub const DEFAULT_FALLBACK_MESSAGE: &str = "Lo siento, hubo un error al procesar tu solicitud.";

/// Substituted when the provider answers with empty text.
pub const DEFAULT_EMPTY_REPLY_MESSAGE: &str = "Lo siento, no pude generar una respuesta.";

/// Label for the composing indicator.
pub const COMPOSING_LABEL: &str = "Escribiendo...";

pub const DEFAULT_QUICK_QUESTIONS: [&str; 4] = [
    "¿Cuáles son sus productos más vendidos?",
    "¿Tienen alguna oferta especial?",
    "¿Cuál es su política de devoluciones?",
    "¿Cómo puedo hacer un seguimiento de mi pedido?",
];
