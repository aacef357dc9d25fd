//! Categories offered for manual selection
//!
//! The id is the value the answer service filters on. Some categories split
//! further into subcategories the user may narrow the question to.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Subcategory {
    pub id: &'static str,
    pub title: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: &'static str,
    pub label: &'static str,
    pub subcategories: &'static [Subcategory],
}

const fn category(
    id: &'static str,
    label: &'static str,
    subcategories: &'static [Subcategory],
) -> Category {
    Category {
        id,
        label,
        subcategories,
    }
}

pub static MANUAL_CATEGORIES: [Category; 20] = [
    category(
        "Учебный процесс",
        "Study process",
        &[
            Subcategory { id: "schedule", title: "Timetable" },
            Subcategory { id: "exams", title: "Exams and retakes" },
            Subcategory { id: "grades", title: "Grades" },
        ],
    ),
    category("Безопасность", "Safety", &[]),
    category(
        "Наука",
        "Research",
        &[
            Subcategory { id: "projects", title: "Research projects" },
            Subcategory { id: "conferences", title: "Conferences" },
        ],
    ),
    category("Практическая подготовка", "Internships and practical training", &[]),
    category(
        "Перемещения студентов / Изменения статусов студентов",
        "Transfers and student status changes",
        &[
            Subcategory { id: "transfer", title: "Transfer" },
            Subcategory { id: "academic_leave", title: "Academic leave" },
            Subcategory { id: "expulsion", title: "Expulsion and reinstatement" },
        ],
    ),
    category("ГИА", "State final certification", &[]),
    category("Траектории обучения", "Study tracks", &[]),
    category("Английский язык", "English language", &[]),
    category("Цифровые компетенции", "Digital skills", &[]),
    category("Онлайн-обучение", "Online learning", &[]),
    category("Дополнительное образование", "Continuing education", &[]),
    category("ОВЗ", "Accessibility support", &[]),
    category("Выпускникам", "Graduates", &[]),
    category("ВУЦ", "Military training centre", &[]),
    category("Внеучебка", "Extracurricular activities", &[]),
    category(
        "Социальные вопросы",
        "Social support",
        &[
            Subcategory { id: "benefits", title: "Benefits" },
            Subcategory { id: "healthcare", title: "Healthcare" },
        ],
    ),
    category(
        "Общежития",
        "Dormitories",
        &[
            Subcategory { id: "check_in", title: "Check-in" },
            Subcategory { id: "housing_fees", title: "Housing fees" },
        ],
    ),
    category("Цифровые системы", "Digital systems", &[]),
    category(
        "Деньги",
        "Money",
        &[
            Subcategory { id: "scholarship", title: "Scholarships" },
            Subcategory { id: "payments", title: "Tuition payments" },
        ],
    ),
    category("Обратная связь", "Feedback", &[]),
];

pub fn find_category(id: &str) -> Option<&'static Category> {
    MANUAL_CATEGORIES.iter().find(|c| c.id == id)
}

impl Category {
    pub fn subcategory(&self, id: &str) -> Option<&'static Subcategory> {
        self.subcategories.iter().find(|s| s.id == id)
    }
}
