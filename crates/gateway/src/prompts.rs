//! Instruction text sent with each operation kind

use retouch_domain::{OperationKind, OperationRequest};

const SAFETY_POLICY: &str = "Do not change a person's fundamental race or ethnicity; \
adjustments to skin tone that are part of a requested filter or adjustment are fine.";

const OUTPUT_RULE: &str = "Return only the final edited image. Do not return text.";

const THREE_D_VIEW: &str = "Re-render the subject of this photo as a stylized 3D model viewed \
from a slightly elevated three-quarter angle, with soft studio lighting and a clean neutral \
backdrop. Keep the subject's identity, colors and proportions recognizable.";

const BACKGROUND_REMOVAL: &str = "Remove the background of this photo completely and keep only \
the main subject with clean, precise edges. The removed area must be transparent.";

const RESTORE: &str = "Restore this old or damaged photograph. Remove scratches, dust, stains \
and creases, fix fading and color casts, and recover detail and sharpness while keeping the \
original composition and the people's likeness unchanged.";

const GROUP_RESTORE: &str = "Restore this old or damaged group photograph. Repair scratches, \
tears and fading across the whole frame, recover every face with natural detail, and keep \
each person's likeness, pose and position exactly as in the original.";

/// Full instruction text for a validated request
pub fn instruction_for(request: &OperationRequest) -> String {
    let user = request.instruction_text();
    match request.kind {
        OperationKind::Edit => {
            let location = request
                .hotspot
                .map(|h| {
                    format!(
                        "Focus on the area around pixel coordinates {}. The rest of the image must stay identical.",
                        h
                    )
                })
                .unwrap_or_default();
            format!(
                "You are an expert photo editor. Perform a natural, localized edit on the provided image.\n\
                 User request: \"{}\"\n\
                 Edit location: {}\n\
                 The edit must blend seamlessly with the surrounding area.\n\
                 {}\n{}",
                user, location, SAFETY_POLICY, OUTPUT_RULE
            )
        }
        OperationKind::Filter => format!(
            "You are an expert photo editor. Apply a stylistic filter to the entire image without \
             changing its composition or content.\n\
             Filter request: \"{}\"\n{}\n{}",
            user, SAFETY_POLICY, OUTPUT_RULE
        ),
        OperationKind::Adjustment => format!(
            "You are an expert photo editor. Perform a natural, global adjustment to the entire \
             image while keeping the result photorealistic.\n\
             Adjustment request: \"{}\"\n{}\n{}",
            user, SAFETY_POLICY, OUTPUT_RULE
        ),
        OperationKind::ThreeDView => format!("{}\n{}", THREE_D_VIEW, OUTPUT_RULE),
        OperationKind::BackgroundRemoval => format!("{}\n{}", BACKGROUND_REMOVAL, OUTPUT_RULE),
        OperationKind::Restore => format!("{}\n{}", RESTORE, OUTPUT_RULE),
        OperationKind::GroupRestore => format!("{}\n{}", GROUP_RESTORE, OUTPUT_RULE),
        OperationKind::Animate => user.to_string(),
    }
}
