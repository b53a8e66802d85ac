// Question bank for the runaway-player challenge

use crate::models::challenge::Prompt;

pub const PROMPTS: &[Prompt] = &[
    Prompt {
        question: "In which year was Paris Saint-Germain founded?",
        answers: &["1970", "1965", "1975", "1980"],
        correct: 0,
    },
    Prompt {
        question: "What is the name of PSG's home stadium?",
        answers: &["Stade de France", "Parc des Princes", "Stade Vélodrome", "Allianz Riviera"],
        correct: 1,
    },
    Prompt {
        question: "Who is the current president of PSG?",
        answers: &["Jean-Michel Aulas", "Nasser Al-Khelaïfi", "Frank McCourt", "Vincent Labrune"],
        correct: 1,
    },
    Prompt {
        question: "Which legendary Brazilian wore the PSG shirt from 2001 to 2003?",
        answers: &["Ronaldo", "Ronaldinho", "Rivaldo", "Romário"],
        correct: 1,
    },
    Prompt {
        question: "In which year did PSG reach its first Champions League final?",
        answers: &["2015", "2018", "2020", "2021"],
        correct: 2,
    },
    Prompt {
        question: "In which year did Qatar Sports Investments buy PSG?",
        answers: &["2009", "2011", "2013", "2015"],
        correct: 1,
    },
    Prompt {
        question: "Who is PSG's historic rival?",
        answers: &["Lyon", "Marseille", "Monaco", "Lille"],
        correct: 1,
    },
    Prompt {
        question: "Who has coached PSG since 2023?",
        answers: &["Thomas Tuchel", "Mauricio Pochettino", "Luis Enrique", "Christophe Galtier"],
        correct: 2,
    },
    Prompt {
        question: "In which year did Neymar join PSG?",
        answers: &["2016", "2017", "2018", "2019"],
        correct: 1,
    },
    Prompt {
        question: "How much did Neymar's transfer to PSG cost?",
        answers: &["€200 million", "€222 million", "€250 million", "€300 million"],
        correct: 1,
    },
    Prompt {
        question: "Which Moroccan full-back plays for PSG?",
        answers: &["Achraf Hakimi", "Hakim Ziyech", "Noussair Mazraoui", "Romain Saïss"],
        correct: 0,
    },
    Prompt {
        question: "Which country does Marquinhos represent?",
        answers: &["Argentina", "Brazil", "Portugal", "Spain"],
        correct: 1,
    },
    Prompt {
        question: "In which year did PSG win its first French league title?",
        answers: &["1986", "1990", "1994", "1998"],
        correct: 0,
    },
];
