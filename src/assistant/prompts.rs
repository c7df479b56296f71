use crate::catalog::CourseRecord;
use crate::core::errors::ApiError;

pub fn system_role(gen_ed_resource: &str) -> String {
    format!(
        "You are a university course search assistant. Your goal is to help students find \
courses offered at the university that interest them.
You only know course titles and descriptions. If students ask about anything else, such as \
meeting times, instructors, prerequisites or websites, say that you cannot currently help with that.
Never make up courses or course details.
If a student asks which courses satisfy a general education category, direct them to {} \
instead of guessing.
Keep answers concise.",
        gen_ed_resource
    )
}

/// User turn when retrieval produced nothing to ground on.
pub fn no_context_prompt(query: &str) -> String {
    format!(
        "You could not find any course information relevant to the student's current message. \
The previous messages in this conversation may help you answer it; otherwise, say that you \
don't know how to help.

Student message: ```
{}
```",
        query.trim()
    )
}

/// User turn embedding the joined course records.
pub fn with_context_prompt(records: &[CourseRecord], query: &str) -> Result<String, ApiError> {
    let context = serde_json::to_string_pretty(records).map_err(ApiError::internal)?;
    Ok(format!(
        "The following courses may help you answer the student's message. Ignore them if they \
are not relevant. Only recommend courses listed here or earlier in the conversation; never \
invent courses that are not listed.

Courses: ```
{}
```

Student message: ```
{}
```",
        context,
        query.trim()
    ))
}

pub fn is_with_context(prompt: &str) -> bool {
    prompt.contains("Courses: ```")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::course;

    #[test]
    fn prompt_variants_are_distinguishable() {
        let plain = no_context_prompt("what's your name");
        let grounded = with_context_prompt(&[course("c-1")], "algorithms").unwrap();

        assert!(!is_with_context(&plain));
        assert!(is_with_context(&grounded));
        assert!(grounded.contains("\"courseID\": \"c-1\""));
        assert!(grounded.contains("never invent"));
    }

    #[test]
    fn system_role_names_the_gen_ed_resource() {
        let role = system_role("https://registrar.example.edu/gened");
        assert!(role.contains("https://registrar.example.edu/gened"));
        assert!(role.contains("Never make up courses"));
    }

    #[test]
    fn system_role_limits_knowledge_to_titles_and_descriptions() {
        let role = system_role("the registrar");
        assert!(role.contains("You only know course titles and descriptions."));
        for declined in ["meeting times", "instructors", "websites"] {
            let pos = role.find(declined).unwrap();
            assert!(pos > role.find("anything else").unwrap(), "{declined} should be declined");
        }
    }
}
